//! Fixed-point trigonometry. Everything downstream stays in integer
//! arithmetic, so sine, cosine and the exponential needed for filter design
//! are table-driven here.

pub const T14_2PI: i32 = 16384;
pub const T14_MASK: i32 = T14_2PI - 1;
pub const T14_PI: i32 = T14_2PI / 2;

/// Significant points on the sine wave (15-bit), one quadrant plus a guard
/// entry for interpolation.
const SIGPSIN15: [i32; 18] = [
    0x0000, 0x0c88, 0x18f8, 0x2528, 0x30f8, 0x3c50, 0x4718, 0x5130, 0x5a80, 0x62f0, 0x6a68, 0x70e0,
    0x7640, 0x7a78, 0x7d88, 0x7f60, 0x8000, 0x7f60,
];

#[inline]
fn sintabil8(n: i32) -> i32 {
    // Stays in bounds as long as T14_2PI is untouched.
    let f = n & 0xff;
    let i = (n >> 8 & 0xff) as usize;
    let a = SIGPSIN15[i];
    let b = SIGPSIN15[i + 1];
    a + ((b - a) * f >> 8)
}

/// 14-bit interpolated sine/cosine. `n` is an angle modulo [`T14_2PI`];
/// both results are 15-bit signed.
#[inline]
pub fn sincos14(n: i32) -> (i32, i32) {
    let n = n & T14_MASK;
    let h = n & ((T14_2PI >> 1) - 1);

    let (s, c) = if h > (T14_2PI >> 2) - 1 {
        (
            sintabil8((T14_2PI >> 1) - h),
            -sintabil8(h - (T14_2PI >> 2)),
        )
    } else {
        (sintabil8(h), sintabil8((T14_2PI >> 2) - h))
    };
    if n > (T14_2PI >> 1) - 1 {
        (-s, -c)
    } else {
        (s, c)
    }
}

pub const EXP_P: i32 = 11;
pub const EXP_ONE: i32 = 1 << EXP_P;
pub const EXP_MASK: i32 = EXP_ONE - 1;
pub const EXP_PI: i32 = 6434;

#[inline]
pub const fn exp_mul(x: i32, y: i32) -> i32 {
    (x * y) >> EXP_P
}

#[inline]
pub const fn exp_div(x: i32, y: i32) -> i32 {
    (x << EXP_P) / y
}

/// Tabulated powers e^1 .. e^4 at [`EXP_P`] fraction bits.
const E11: [i32; 5] = [EXP_ONE, 5567, 15133, 41135, 111817];

/// Fixed-point e^x with [`EXP_P`] fraction bits. Reduces by tabulated powers
/// of e, then sums the Taylor series for the fractional part until the next
/// term vanishes. A negative argument returns the reciprocal.
pub fn expx(n: i32) -> i32 {
    if n == 0 {
        return EXP_ONE;
    }
    let neg = n < 0;
    let mut n = n.abs();

    let mut idx = n >> EXP_P;
    let mut res = EXP_ONE;
    for _ in 0..idx / 4 {
        res = exp_mul(res, E11[4]);
    }
    idx &= 3;
    if idx > 0 {
        res = exp_mul(res, E11[idx as usize]);
    }

    n &= EXP_MASK;
    let mut nxt = EXP_ONE;
    let mut acc = 0;
    let mut del = 1;
    for i in 1..17 {
        acc += nxt / del;
        nxt = exp_mul(nxt, n);
        del *= i;
        if del > nxt || nxt <= 0 || del <= 0 {
            break;
        }
    }
    res = exp_mul(res, acc);

    if neg {
        res = exp_div(EXP_ONE, res);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn sincos_cardinal_points() {
        assert_eq!(sincos14(0), (0, 32768));
        assert_eq!(sincos14(T14_2PI / 4), (32768, 0));
        assert_eq!(sincos14(T14_2PI / 2), (0, -32768));
        assert_eq!(sincos14(3 * T14_2PI / 4), (-32768, 0));
    }

    #[test]
    fn sincos_tracks_reference() {
        for n in (0..T14_2PI).step_by(37) {
            let (s, c) = sincos14(n);
            let a = n as f64 * TAU / T14_2PI as f64;
            let rs = (32768.0 * a.sin()).round();
            let rc = (32768.0 * a.cos()).round();
            assert!((s as f64 - rs).abs() <= 64.0, "sin({n}): {s} vs {rs}");
            assert!((c as f64 - rc).abs() <= 64.0, "cos({n}): {c} vs {rc}");
        }
    }

    #[test]
    fn sincos_wraps_angles() {
        assert_eq!(sincos14(-1), sincos14(T14_2PI - 1));
        assert_eq!(sincos14(T14_2PI + 5), sincos14(5));
    }

    #[test]
    fn expx_tracks_reference() {
        assert_eq!(expx(0), EXP_ONE);
        assert_eq!(expx(EXP_ONE), 5567);
        assert_eq!(expx(2 * EXP_ONE), 15133);
        for n in [-4096, -2048, -1024, -512, 512, 1024, 3000] {
            let want = (EXP_ONE as f64 * (n as f64 / EXP_ONE as f64).exp()).round();
            let got = expx(n) as f64;
            assert!(
                (got - want).abs() <= want.abs() * 0.01 + 8.0,
                "expx({n}): {got} vs {want}"
            );
        }
    }
}
