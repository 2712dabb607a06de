// Cache keys and customer/order matching require byte-identical strings, so
// every path that compares names or addresses goes through here.

pub fn normalize_text(value: &str) -> String {
    value
        .trim()
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_short_name(value: &str) -> String {
    normalize_text(value)
}

// 8-digit values are reformatted as #####-###, other lengths returned as
// bare digits.
pub fn normalize_cep(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 8 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

pub fn normalize_address<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|part| normalize_text(part.as_ref()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// "Cidade - UF" or "Cidade, UF"; a trailing two-letter token is the state.
pub fn parse_city_state(value: &str) -> (Option<String>, Option<String>) {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return (None, None);
    }

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let parts: Vec<&str> = collapsed
        .split(|c| c == '-' || c == ',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        return (None, None);
    }

    let mut city = Some(parts[0].to_string());
    let mut state = None;

    let last = parts[parts.len() - 1];
    if last.len() == 2 && last.chars().all(|c| c.is_ascii_alphabetic()) {
        state = Some(last.to_uppercase());
        if parts.len() > 1 {
            let joined = parts[..parts.len() - 1].join(" ");
            if !joined.is_empty() {
                city = Some(joined);
            }
        }
    }

    (city, state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_uppercased_and_collapsed() {
        assert_eq!(normalize_text("  Acme   Alumínio  "), "ACME ALUMÍNIO");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn cep_is_reformatted_when_eight_digits() {
        assert_eq!(normalize_cep("13054703"), "13054-703");
        assert_eq!(normalize_cep("13.054-703"), "13054-703");
        assert_eq!(normalize_cep("1305"), "1305");
        assert_eq!(normalize_cep("sem cep"), "");
    }

    #[test]
    fn address_joins_non_empty_parts() {
        let parts = ["Rua A, 10", "", "  Campinas ", "SP"];
        assert_eq!(normalize_address(parts), "RUA A, 10, CAMPINAS, SP");
    }

    #[test]
    fn city_state_splits_on_dash_and_comma() {
        assert_eq!(
            parse_city_state("Campinas - SP"),
            (Some("Campinas".into()), Some("SP".into()))
        );
        assert_eq!(
            parse_city_state("Sao Jose dos Campos, sp"),
            (Some("Sao Jose dos Campos".into()), Some("SP".into()))
        );
        assert_eq!(parse_city_state("Campinas"), (Some("Campinas".into()), None));
        assert_eq!(parse_city_state("   "), (None, None));
    }
}
