//! Number formatting helpers for result output
//!
//! Results are formatted the way a browser prints numbers: integral values
//! carry no decimal point, non-finite values are spelled out.

/// Render a number without a trailing `.0` for integral values
pub fn js_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buffer = itoa::Buffer::new();
        return buffer.format(n as i64).to_string();
    }
    n.to_string()
}

/// Round half-up to `precision` decimal places and render the result
///
/// `to_fixed(2.5, 0)` is `"3"`, `to_fixed(-2.5, 0)` is `"-2"`.
pub fn to_fixed(value: f64, precision: i32) -> String {
    let power = 10f64.powi(precision);
    js_number((value * power + 0.5).floor() / power)
}

/// Group every run of digits by three with spaces, counting from the right
///
/// `number_with_spaces(2000000.0)` is `"2 000 000"`. Fraction digits are
/// grouped the same way: `number_with_spaces(0.12345)` is `"0.12 345"`.
pub fn number_with_spaces(value: f64) -> String {
    let rendered = js_number(value);
    let mut grouped = String::with_capacity(rendered.len() + rendered.len() / 3);

    let mut rest = rendered.as_str();
    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        grouped.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
        push_grouped(&mut grouped, &tail[..end]);
        rest = &tail[end..];
    }
    grouped.push_str(rest);
    grouped
}

fn push_grouped(out: &mut String, digits: &str) {
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_number() {
        assert_eq!(js_number(15.0), "15");
        assert_eq!(js_number(-0.0), "0");
        assert_eq!(js_number(0.25), "0.25");
        assert_eq!(js_number(f64::NAN), "NaN");
        assert_eq!(js_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_to_fixed_rounds_half_up() {
        assert_eq!(to_fixed(34835.101416837075, 0), "34835");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(-2.5, 0), "-2");
        assert_eq!(to_fixed(3.14159, 2), "3.14");
        assert_eq!(to_fixed(f64::NAN, 0), "NaN");
    }

    #[test]
    fn test_number_with_spaces() {
        assert_eq!(number_with_spaces(999.0), "999");
        assert_eq!(number_with_spaces(34835.0), "34 835");
        assert_eq!(number_with_spaces(2000000.0), "2 000 000");
        assert_eq!(number_with_spaces(-1234567.5), "-1 234 567.5");
        assert_eq!(number_with_spaces(0.12345), "0.12 345");
        assert_eq!(number_with_spaces(f64::NAN), "NaN");
    }
}
