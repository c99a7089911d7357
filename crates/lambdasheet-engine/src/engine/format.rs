/// Format a number in its canonical display form.
///
/// This is the shortest string that round-trips to the same `f64`, laid out
/// in positional notation for `1e-4 <= |n| < 1e16` (always with a fractional
/// part, so `2` renders as `2.0`) and in scientific notation with a signed,
/// at least two-digit exponent otherwise (`1e+16`, `1.5e-05`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-1.2345e3".
    let sci = format!("{:e}", n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

    let body = if (-4..16).contains(&exp) {
        if exp >= 0 {
            let point = exp as usize + 1;
            if digits.len() <= point {
                format!("{}{}.0", digits, "0".repeat(point - digits.len()))
            } else {
                format!("{}.{}", &digits[..point], &digits[point..])
            }
        } else {
            format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
        }
    } else {
        let (head, tail) = digits.split_at(1);
        let sign = if exp < 0 { '-' } else { '+' };
        if tail.is_empty() {
            format!("{}e{}{:02}", head, sign, exp.abs())
        } else {
            format!("{}.{}e{}{:02}", head, tail, sign, exp.abs())
        }
    };

    if negative {
        format!("-{}", body)
    } else {
        body
    }
}
