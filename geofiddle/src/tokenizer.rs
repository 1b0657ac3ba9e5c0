//! Découpage de texte DSV (valeurs séparées par délimiteurs) en nombres

use thiserror::Error;

/// Délimiteurs acceptés entre deux valeurs, en plus des blancs
const DELIMITERS: [char; 9] = [',', ';', '|', '#', '&', '\\', ':', '/', ' '];

/// Erreur de tokenisation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

#[inline]
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || DELIMITERS.contains(&c)
}

/// Itère sur les tokens non vides d'un texte
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_delimiter).filter(|t| !t.is_empty())
}

/// Parse un nombre fini (fast-float, `+` initial toléré)
#[inline]
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.strip_prefix('+').unwrap_or(token);
    fast_float::parse::<f64, _>(token)
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse tout le texte en liste de nombres, échoue au premier token invalide
pub fn parse_dsv(text: &str) -> Result<Vec<f64>, TokenError> {
    tokens(text)
        .map(|t| parse_number(t).ok_or_else(|| TokenError::InvalidNumber(t.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_delimiters() {
        let numbers = parse_dsv("1,2;3|4\t5 6#7&8\\9:10/11").unwrap();
        assert_eq!(numbers.len(), 11);
        assert_eq!(numbers[10], 11.0);
    }

    #[test]
    fn test_consecutive_delimiters_are_collapsed() {
        assert_eq!(parse_dsv("  1 ,  2  ").unwrap(), vec![1.0, 2.0]);
        assert_eq!(parse_dsv("1\n2\r\n3").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_signs_and_exponents() {
        assert_eq!(parse_dsv("-0.1276,+51.5074").unwrap(), vec![-0.1276, 51.5074]);
        assert_eq!(parse_dsv("5.3e5").unwrap(), vec![530000.0]);
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            parse_dsv("abc,1"),
            Err(TokenError::InvalidNumber("abc".to_string()))
        );
        assert!(parse_dsv("nan,1").is_err());
        assert!(parse_dsv("1.2.3").is_err());
    }

    #[test]
    fn test_empty() {
        assert!(parse_dsv("").unwrap().is_empty());
        assert!(parse_dsv(" ,; ").unwrap().is_empty());
    }
}
