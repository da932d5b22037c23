const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 24.0 * MINUTES_PER_HOUR;

/// Minutes in an ISO-8601 duration, a unit phrase or a bare number.
pub fn parse_minutes(raw: &str) -> Option<u32> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let iso_body = text
        .strip_prefix('p')
        .filter(|body| body.starts_with(|c: char| c.is_ascii_digit() || c == 't'));
    let minutes = if let Some(iso) = iso_body {
        parse_iso(iso)?
    } else if let Ok(bare) = text.parse::<f64>() {
        bare
    } else {
        parse_phrase(&text)?
    };

    if minutes.is_finite() && minutes >= 0.0 && minutes <= u32::MAX as f64 {
        Some(minutes.round() as u32)
    } else {
        None
    }
}

fn parse_iso(body: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_component = false;

    for c in body.chars() {
        match c {
            't' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' | '.' => number.push(c),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let scale = match (unit, in_time) {
                    ('d', false) => MINUTES_PER_DAY,
                    ('w', false) => 7.0 * MINUTES_PER_DAY,
                    ('h', true) => MINUTES_PER_HOUR,
                    ('m', true) => 1.0,
                    ('s', true) => 1.0 / 60.0,
                    _ => return None,
                };
                total += value * scale;
                seen_component = true;
            }
        }
    }

    (number.is_empty() && seen_component).then_some(total)
}

fn parse_phrase(text: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut pending: Option<f64> = None;
    let mut seen_component = false;

    for token in split_number_unit(text) {
        match token {
            Token::Number(value) => {
                if pending.is_some() {
                    return None;
                }
                pending = Some(value);
            }
            Token::Word(word) => match unit_scale(&word) {
                Some(scale) => {
                    total += pending.take()? * scale;
                    seen_component = true;
                }
                // Labels like "prep" or "about"; a number must not be dangling.
                None if pending.is_none() => {}
                None => return None,
            },
        }
    }

    if pending.is_some() || !seen_component {
        return None;
    }
    Some(total)
}

fn unit_scale(word: &str) -> Option<f64> {
    match word {
        "d" | "day" | "days" => Some(MINUTES_PER_DAY),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(MINUTES_PER_HOUR),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(1.0),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1.0 / 60.0),
        _ => None,
    }
}

enum Token {
    Number(f64),
    Word(String),
}

fn split_number_unit(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_number = false;

    for c in text.chars() {
        if c.is_ascii_digit() || (c == '.' && current_is_number) {
            if !current_is_number {
                flush(&mut current, false, &mut tokens);
                current_is_number = true;
            }
            current.push(c);
        } else if c.is_alphabetic() {
            if current_is_number {
                flush(&mut current, true, &mut tokens);
                current_is_number = false;
            }
            current.push(c);
        } else {
            flush(&mut current, current_is_number, &mut tokens);
            current_is_number = false;
        }
    }
    flush(&mut current, current_is_number, &mut tokens);
    tokens
}

fn flush(current: &mut String, is_number: bool, tokens: &mut Vec<Token>) {
    if current.is_empty() {
        return;
    }
    let token = match current.parse() {
        Ok(value) if is_number => Token::Number(value),
        _ => Token::Word(current.clone()),
    };
    tokens.push(token);
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_durations() {
        assert_eq!(parse_minutes("PT45M"), Some(45));
        assert_eq!(parse_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_minutes("P1DT2H"), Some(1560));
        assert_eq!(parse_minutes("PT90S"), Some(2));
    }

    #[test]
    fn parses_unit_phrases() {
        assert_eq!(parse_minutes("15 min"), Some(15));
        assert_eq!(parse_minutes("1 hr 30 mins"), Some(90));
        assert_eq!(parse_minutes("2 Hours"), Some(120));
        assert_eq!(parse_minutes("1h5m"), Some(65));
        assert_eq!(parse_minutes("1 hour and 15 minutes"), Some(75));
        assert_eq!(parse_minutes("1.5 hours"), Some(90));
    }

    #[test]
    fn labelled_phrases_skip_leading_words() {
        assert_eq!(parse_minutes("prep 10 min"), Some(10));
        assert_eq!(parse_minutes("Ready in 25 minutes"), Some(25));
        assert_eq!(parse_minutes("about 2 hours"), Some(120));
        assert_eq!(parse_minutes("pt45m"), Some(45));
    }

    #[test]
    fn bare_numbers_are_minutes() {
        assert_eq!(parse_minutes("40"), Some(40));
        assert_eq!(parse_minutes(" 0 "), Some(0));
    }

    #[test]
    fn garbage_is_unparseable() {
        for raw in ["", "quick", "PT", "PTXM", "15 parsecs", "min", "10 20 min", "-5", "NaN"] {
            assert_eq!(parse_minutes(raw), None, "{raw:?}");
        }
    }
}
