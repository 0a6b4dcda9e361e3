use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

// A raw progress notification from the subprocess: a free-text status
// line or an already-numeric percentage.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSample {
    Text(String),
    Percent(f64),
}

impl ProgressSample {
    // The status format is not a stable contract, so a malformed line is
    // dropped (None), never an error that could abort a download.
    pub fn parse(&self) -> Option<f64> {
        match self {
            ProgressSample::Percent(p) => bounded(*p),
            ProgressSample::Text(line) => parse_line(line),
        }
    }
}

fn parse_line(line: &str) -> Option<f64> {
    let m = NUMBER_RE.find(line)?;
    bounded(m.as_str().parse::<f64>().ok()?)
}

fn bounded(value: f64) -> Option<f64> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_with_percent_sign() {
        assert_eq!(ProgressSample::Text("45.2%".to_string()).parse(), Some(45.2));
    }

    #[test]
    fn text_ytdlp_template_output() {
        assert_eq!(ProgressSample::Text("  42.3%".to_string()).parse(), Some(42.3));
        assert_eq!(
            ProgressSample::Text(" 97.8% of ~12.4MiB at 1.2MiB/s".to_string()).parse(),
            Some(97.8)
        );
    }

    #[test]
    fn text_integer_percent() {
        assert_eq!(ProgressSample::Text("100%".to_string()).parse(), Some(100.0));
    }

    #[test]
    fn structured_percent() {
        assert_eq!(ProgressSample::Percent(30.0).parse(), Some(30.0));
        assert_eq!(ProgressSample::Percent(0.0).parse(), Some(0.0));
        assert_eq!(ProgressSample::Percent(100.0).parse(), Some(100.0));
    }

    #[test]
    fn garbage_is_dropped() {
        assert_eq!(ProgressSample::Text("garbage".to_string()).parse(), None);
        assert_eq!(ProgressSample::Text(String::new()).parse(), None);
    }

    #[test]
    fn out_of_range_is_dropped() {
        assert_eq!(ProgressSample::Percent(150.0).parse(), None);
        assert_eq!(ProgressSample::Percent(-1.0).parse(), None);
        assert_eq!(ProgressSample::Text("-5%".to_string()).parse(), None);
        assert_eq!(ProgressSample::Text("250.0%".to_string()).parse(), None);
    }

    #[test]
    fn non_finite_is_dropped() {
        assert_eq!(ProgressSample::Percent(f64::NAN).parse(), None);
        assert_eq!(ProgressSample::Percent(f64::INFINITY).parse(), None);
    }
}
