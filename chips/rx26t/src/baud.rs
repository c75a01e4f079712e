// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Baud rate divisor search.
//!
//! The bit rate generator divides the peripheral clock by one of a fixed set
//! of divisors (selected through the ABCS/BGDM/ABCSE base-clock bits and the
//! CKS prescaler) and then by an 8-bit counter (BRR). [`compute_bit_rate`]
//! picks the divisor table row and counter value minimizing bit rate error,
//! falling back to the fractional modulation duty register (MDDR) when
//! integer division alone cannot reach 1% in asynchronous mode.
//!
//! The solver is pure: it returns the register settings to apply, and
//! produces none at all when the rate is unattainable.

use serial_hil::serial::Mode;
use serial_hil::ErrorCode;

/// One row of a bit rate divisor table.
pub struct BaudDivisor {
    pub divisor: i16,
    pub abcs: u8,
    pub bgdm: u8,
    pub abcse: u8,
    pub cks: u8,
}

// Asynchronous divisors.
// BRR = (PCLK / (divisor * baud)) - 1
// abcs=0, bgdm=0, abcse=0: divisor = 64 * 2^(2n-1)
// abcs=1, bgdm=0, abcse=0 or abcs=0, bgdm=1, abcse=0: divisor = 32 * 2^(2n-1)
// abcs=1, bgdm=1, abcse=0: divisor = 16 * 2^(2n-1)
// abcse=1 (any abcs/bgdm): divisor = 12 * 2^(2n-1); not wired on channel 12
pub(crate) const ASYNC_BAUD: [BaudDivisor; 13] = [
    BaudDivisor { divisor: 6, abcs: 1, bgdm: 1, abcse: 1, cks: 0 },
    BaudDivisor { divisor: 8, abcs: 1, bgdm: 1, abcse: 0, cks: 0 },
    BaudDivisor { divisor: 16, abcs: 0, bgdm: 1, abcse: 0, cks: 0 },
    BaudDivisor { divisor: 24, abcs: 1, bgdm: 1, abcse: 1, cks: 1 },
    BaudDivisor { divisor: 32, abcs: 0, bgdm: 0, abcse: 0, cks: 0 },
    BaudDivisor { divisor: 64, abcs: 0, bgdm: 1, abcse: 0, cks: 1 },
    BaudDivisor { divisor: 96, abcs: 1, bgdm: 1, abcse: 1, cks: 2 },
    BaudDivisor { divisor: 128, abcs: 0, bgdm: 0, abcse: 0, cks: 1 },
    BaudDivisor { divisor: 256, abcs: 0, bgdm: 1, abcse: 0, cks: 2 },
    BaudDivisor { divisor: 384, abcs: 1, bgdm: 1, abcse: 1, cks: 3 },
    BaudDivisor { divisor: 512, abcs: 0, bgdm: 0, abcse: 0, cks: 2 },
    BaudDivisor { divisor: 1024, abcs: 0, bgdm: 1, abcse: 0, cks: 3 },
    BaudDivisor { divisor: 2048, abcs: 0, bgdm: 0, abcse: 0, cks: 3 },
];

// Clock-synchronous and simple SPI divisors.
// abcs=0, bgdm=0: divisor = 8 * 2^(2n-1)
pub(crate) const SYNC_BAUD: [BaudDivisor; 4] = [
    BaudDivisor { divisor: 4, abcs: 0, bgdm: 0, abcse: 0, cks: 0 },
    BaudDivisor { divisor: 16, abcs: 0, bgdm: 0, abcse: 0, cks: 1 },
    BaudDivisor { divisor: 64, abcs: 0, bgdm: 0, abcse: 0, cks: 2 },
    BaudDivisor { divisor: 256, abcs: 0, bgdm: 0, abcse: 0, cks: 3 },
];

/// Register settings produced by the divisor search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudSettings {
    pub brr: u8,
    pub cks: u8,
    pub abcs: bool,
    pub bgdm: bool,
    pub abcse: bool,
    /// Fractional correction active; `mddr` is only meaningful when set.
    pub brme: bool,
    pub mddr: u8,
}

/// Determine the best bit rate register settings for `baud` at `pclk_hz`.
///
/// Returns the settings together with the resulting bit rate error in tenths
/// of a percent (e.g. 16 = 1.6% error). `has_abcse` masks the table rows
/// requiring the extended base clock on channels that lack it.
///
/// Errors: `InvalidArgument` if either input is zero;
/// `BaudRateUnattainable` if no divisor keeps the 8-bit counter in range
/// (the caller must leave the bit rate registers untouched in that case).
pub fn compute_bit_rate(
    mode: Mode,
    has_abcse: bool,
    pclk_hz: u32,
    baud: u32,
) -> Result<(BaudSettings, i32), ErrorCode> {
    if pclk_hz == 0 || baud == 0 {
        return Err(ErrorCode::InvalidArgument);
    }

    let table: &[BaudDivisor] = if mode == Mode::Asynchronous {
        &ASYNC_BAUD
    } else {
        &SYNC_BAUD
    };

    // BRR must fit in 8 bits: BRR = ratio / divisor - 1.
    let ratio = pclk_hz / baud;

    let mut selected = None;
    for entry in table.iter() {
        if mode == Mode::Asynchronous && !has_abcse && entry.abcse == 1 {
            continue;
        }
        if ratio < (entry.divisor as u32) * 256 {
            selected = Some(entry);
            break;
        }
    }
    let entry = selected.ok_or(ErrorCode::BaudRateUnattainable)?;

    let divisor = entry.divisor as u32;
    let n = ratio / divisor; // PCLK / (baud * divisor) = BRR + 1
    if n == 0 {
        return Err(ErrorCode::BaudRateUnattainable);
    }

    // Divide by half the divisor first; if that is odd, "round up" by
    // skipping the -1 correction.
    let half = ratio / (divisor / 2);
    let brr = if half & 0x01 != 0 {
        half / 2
    } else {
        (half / 2) - 1
    };

    let mut settings = BaudSettings {
        brr: brr as u8,
        cks: entry.cks,
        abcs: entry.abcs == 1,
        bgdm: entry.bgdm == 1,
        abcse: entry.abcse == 1,
        brme: false,
        mddr: 0,
    };

    let error = ((pclk_hz as f32) / ((baud * divisor * n) as f32) - 1.0) * 100.0;
    let abs_error = if error < 0.0 { -error } else { error };

    // Synchronous and SPI paths have no fractional correction hardware.
    if abs_error <= 1.0 || mode != Mode::Asynchronous {
        return Ok((settings, (error * 10.0) as i32));
    }

    // Assume a zero-error integer counter and let the modulation duty absorb
    // the residual. M is scaled by 256 and rounded to nearest, ties away
    // from zero.
    settings.brr = (n - 1) as u8;
    let float_m =
        ((baud as f32) * (divisor as f32) * 256.0 * (n as f32)) / (pclk_hz as f32) * 2.0;
    let int_m = float_m as u32;
    let int_m = if int_m & 0x01 != 0 {
        (int_m / 2) + 1
    } else {
        int_m / 2
    };
    settings.mddr = int_m as u8;
    settings.brme = true;

    let error = ((pclk_hz as f32) / (((divisor * n * baud) as f32) * (256.0 / (int_m as f32)))
        - 1.0)
        * 100.0;
    Ok((settings, (error * 10.0) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_inputs() {
        assert_eq!(
            compute_bit_rate(Mode::Asynchronous, true, 0, 115200),
            Err(ErrorCode::InvalidArgument)
        );
        assert_eq!(
            compute_bit_rate(Mode::Asynchronous, true, 24_000_000, 0),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn async_24mhz_115200_uses_smallest_divisor_with_fractional_correction() {
        let (settings, err) =
            compute_bit_rate(Mode::Asynchronous, true, 24_000_000, 115200).unwrap();
        // ratio = 208, first row (divisor 6) qualifies immediately.
        assert!(settings.abcse);
        assert!(settings.abcs);
        assert!(settings.bgdm);
        assert_eq!(settings.cks, 0);
        // Integer-only error is 2.1%, so MDDR kicks in: N = 34, M = 251.
        assert!(settings.brme);
        assert_eq!(settings.brr, 33);
        assert_eq!(settings.mddr, 251);
        let abs = err.abs();
        assert!(abs <= 10, "residual error {abs} exceeds 1.0%");
    }

    #[test]
    fn channel_without_abcse_skips_extended_rows() {
        let (settings, err) =
            compute_bit_rate(Mode::Asynchronous, false, 24_000_000, 115200).unwrap();
        // divisor 8 row: N = 26, error 0.16%, no fractional correction.
        assert!(!settings.abcse);
        assert!(settings.abcs);
        assert!(settings.bgdm);
        assert_eq!(settings.cks, 0);
        assert_eq!(settings.brr, 25);
        assert!(!settings.brme);
        assert_eq!(err, 1);
    }

    #[test]
    fn synchronous_mode_is_exact_at_integer_rates() {
        let (settings, err) =
            compute_bit_rate(Mode::Synchronous, true, 24_000_000, 1_000_000).unwrap();
        assert_eq!(settings.brr, 5);
        assert_eq!(settings.cks, 0);
        assert!(!settings.brme);
        assert_eq!(err, 0);
    }

    #[test]
    fn synchronous_mode_never_applies_fractional_correction() {
        // 8.5% integer error, but sync mode has no MDDR path.
        let (settings, err) =
            compute_bit_rate(Mode::Synchronous, true, 24_000_000, 1_843_200).unwrap();
        assert!(!settings.brme);
        assert_eq!(settings.brr, 2);
        assert_eq!(err, 85);
    }

    #[test]
    fn unattainable_rates_report_the_sentinel() {
        // ratio far beyond the largest divisor row.
        assert_eq!(
            compute_bit_rate(Mode::Asynchronous, true, 24_000_000, 1),
            Err(ErrorCode::BaudRateUnattainable)
        );
        assert_eq!(
            compute_bit_rate(Mode::Synchronous, true, 60_000_000, 100),
            Err(ErrorCode::BaudRateUnattainable)
        );
    }

    #[test]
    fn attainable_rates_produce_in_range_counters() {
        let pclks = [8_000_000, 16_000_000, 24_000_000, 32_000_000, 48_000_000, 60_000_000];
        let bauds = [
            300, 1200, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
        ];
        for &pclk in pclks.iter() {
            for &baud in bauds.iter() {
                let (settings, err) = compute_bit_rate(Mode::Asynchronous, true, pclk, baud)
                    .unwrap_or_else(|e| panic!("{pclk}/{baud} unexpectedly failed: {e:?}"));
                // BRR + 1 must have fit the 8-bit counter.
                let ratio = pclk / baud;
                let divisor = ratio / (settings.brr as u32 + 1);
                assert!(divisor > 0);
                assert!(ratio < divisor * 256 * 2);
                // Fractional correction keeps the duty in the upper half.
                if settings.brme {
                    assert!(settings.mddr >= 128, "MDDR {} out of range", settings.mddr);
                }
                assert!(err.abs() <= 1000);
            }
        }
    }
}
