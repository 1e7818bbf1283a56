// hearth-server/src/services/money.rs

//! Prices are integer cents internally and decimal strings at the edge.

/// Parses a decimal amount such as `"12.5"` or `"-3.10"` into cents.
/// Anything that is not a plain decimal reads as zero. Digits past the
/// second decimal place are rounded half away from zero.
pub fn parse_cents(raw: &str) -> i64 {
  let raw = raw.trim();
  let (negative, digits) = match raw.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, raw.strip_prefix('+').unwrap_or(raw)),
  };
  let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
  if whole.is_empty() && frac.is_empty() {
    return 0;
  }
  if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
    return 0;
  }

  let whole: i64 = if whole.is_empty() {
    0
  } else {
    match whole.parse::<i64>() {
      Ok(v) => v,
      Err(_) => return 0,
    }
  };
  let mut frac_digits = frac.bytes().map(|b| i64::from(b - b'0'));
  let tenths = frac_digits.next().unwrap_or(0);
  let hundredths = frac_digits.next().unwrap_or(0);
  let round_up = frac_digits.next().is_some_and(|d| d >= 5);

  let cents = whole
    .checked_mul(100)
    .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)));
  match cents {
    Some(c) if negative => -c,
    Some(c) => c,
    None => 0,
  }
}

pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
