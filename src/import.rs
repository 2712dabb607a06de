use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::entities::{Customer, Order, Transportadora};
use crate::normalize::{normalize_cep, normalize_short_name, normalize_text};
use crate::overrides;

pub const ORDER_DATE_COLUMNS: [&str; 5] = [
    "Data Implant",
    "Data Entrega",
    "Data Ent.Orig",
    "Data Prog",
    "Data Ult Fat",
];

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d", "%d-%m-%Y"];

// Excel serial day 0.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub customers: Option<usize>,
    pub orders: Option<usize>,
}

fn get_str<'a>(row: &'a Map<String, Value>, column: &str) -> Option<&'a str> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_empty_row(row: &Map<String, Value>) -> bool {
    row.values().all(|value| match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

pub fn clean_rows(rows: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .filter(|row| !is_empty_row(row))
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| match value {
                    Value::String(s) => (key, Value::String(normalize_text(&s))),
                    other => (key, other),
                })
                .collect()
        })
        .collect()
}

// Handles the common Brazilian and ISO formats plus Excel date serials.
pub fn parse_date_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => {
            let serial = number.as_f64()?;
            if serial <= 0.0 {
                return None;
            }
            let (y, m, d) = EXCEL_EPOCH;
            let base = NaiveDate::from_ymd_opt(y, m, d)?;
            let date = base + Duration::days(serial as i64);
            Some(date.format("%Y-%m-%d").to_string())
        }
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            for format in DATE_FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                    return Some(date.format("%Y-%m-%d").to_string());
                }
            }
            if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                return Some(datetime.date_naive().format("%Y-%m-%d").to_string());
            }
            None
        }
        _ => None,
    }
}

pub fn normalize_order_dates(row: &mut Map<String, Value>) {
    for column in ORDER_DATE_COLUMNS {
        if let Some(value) = row.get(column) {
            let parsed = parse_date_value(value);
            row.insert(
                column.to_string(),
                parsed.map(Value::String).unwrap_or(Value::Null),
            );
        }
    }
}

pub fn build_customer(row: &Map<String, Value>) -> Customer {
    let short_source = get_str(row, "Nome Abreviado")
        .or_else(|| get_str(row, "Nome"))
        .unwrap_or("");

    let address_parts: Vec<&str> = ["Logradouro", "Número", "Complemento", "Bairro"]
        .iter()
        .filter_map(|column| get_str(row, column))
        .collect();
    let address = if address_parts.is_empty() {
        None
    } else {
        Some(address_parts.join(", "))
    };

    let cep = get_str(row, "CEP")
        .map(normalize_cep)
        .filter(|cep| !cep.is_empty());

    Customer {
        id: Uuid::new_v4(),
        short_name: normalize_short_name(short_source),
        name: get_str(row, "Nome").unwrap_or("").to_string(),
        address,
        city: get_str(row, "Cidade").map(String::from),
        state: get_str(row, "Estado").map(String::from),
        cep,
        lat: None,
        lon: None,
        geocoded: false,
        transportadora: Transportadora::default(),
        use_transportadora: false,
        raw_data: Value::Object(row.clone()),
        created_at: Utc::now(),
    }
}

// Orders inherit the parent customer's coordinates and CEP at build time
// when the customer is already geocoded.
pub fn build_order(row: &Map<String, Value>, customer: Option<&Customer>) -> Order {
    let customer_name = get_str(row, "Cliente").unwrap_or("").to_string();
    let short_name = normalize_short_name(&customer_name);

    let rota = get_str(row, "Rota").map(String::from);
    let rota_normalized = rota
        .as_deref()
        .map(normalize_text)
        .filter(|r| !r.is_empty());

    let mut cep = ["CEP", "Cep", "CEP Entrega"]
        .iter()
        .find_map(|column| get_str(row, column))
        .map(normalize_cep)
        .filter(|cep| !cep.is_empty());
    if cep.is_none() {
        cep = customer
            .and_then(|c| c.cep.as_deref())
            .map(normalize_cep)
            .filter(|cep| !cep.is_empty());
    }
    if cep.is_none() {
        cep = rota_normalized
            .as_deref()
            .and_then(overrides::default_cep_for_route)
            .map(String::from);
    }

    let coords = customer.and_then(Customer::coordinates);

    Order {
        id: Uuid::new_v4(),
        customer_short_name: short_name,
        customer_name,
        delivery_date: get_str(row, "Data Entrega").map(String::from),
        rota,
        rota_normalized,
        cep,
        lat: coords.map(|c| c.lat),
        lon: coords.map(|c| c.lon),
        geocoded: coords.is_some(),
        raw_data: Value::Object(row.clone()),
        created_at: Utc::now(),
    }
}

pub fn build_orders(
    rows: &[Map<String, Value>],
    customers: &HashMap<String, Customer>,
) -> Vec<Order> {
    rows.iter()
        .map(|row| {
            let cliente = get_str(row, "Cliente").unwrap_or("");
            let customer = customers.get(&normalize_short_name(cliente));
            build_order(row, customer)
        })
        .collect()
}

// Up to five distinct unmatched customer labels, for the import error.
pub fn collect_unmatched(
    rows: &[Map<String, Value>],
    short_names: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unmatched = Vec::new();

    for row in rows {
        let cliente = get_str(row, "Cliente").unwrap_or("");
        let short_name = normalize_short_name(cliente);
        if short_names.contains(&short_name) || !seen.insert(short_name) {
            continue;
        }

        let label = match get_str(row, "Rota") {
            Some(rota) => format!("{} (rota {})", cliente, rota),
            None => cliente.to_string(),
        };
        unmatched.push(label);

        if unmatched.len() == 5 {
            break;
        }
    }

    unmatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn blank_rows_are_dropped_and_strings_normalized() {
        let rows = vec![
            row(json!({ "Nome": "  acme  metais ", "CEP": "" })),
            row(json!({ "Nome": "   ", "CEP": null })),
        ];

        let cleaned = clean_rows(rows);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0]["Nome"], "ACME METAIS");
    }

    #[test]
    fn date_cells_parse_from_strings_and_excel_serials() {
        assert_eq!(
            parse_date_value(&json!("25/12/2024")),
            Some("2024-12-25".into())
        );
        assert_eq!(
            parse_date_value(&json!("2024-12-25")),
            Some("2024-12-25".into())
        );
        // 45000 days after 1899-12-30
        assert_eq!(parse_date_value(&json!(45000)), Some("2023-03-15".into()));
        assert_eq!(parse_date_value(&json!("")), None);
        assert_eq!(parse_date_value(&json!("not a date")), None);
        assert_eq!(parse_date_value(&json!(0)), None);
    }

    #[test]
    fn order_date_columns_are_rewritten_in_place() {
        let mut order_row = row(json!({
            "Cliente": "ACME",
            "Data Entrega": "01/02/2025",
            "Data Prog": "invalid",
        }));

        normalize_order_dates(&mut order_row);
        assert_eq!(order_row["Data Entrega"], "2025-02-01");
        assert_eq!(order_row["Data Prog"], Value::Null);
    }

    #[test]
    fn customer_is_built_from_brazilian_columns() {
        let customer = build_customer(&row(json!({
            "Nome": "ACME METAIS LTDA",
            "Nome Abreviado": "acme metais",
            "Logradouro": "RUA A",
            "Número": "10",
            "Bairro": "CENTRO",
            "Cidade": "CAMPINAS",
            "Estado": "SP",
            "CEP": "13054703",
        })));

        assert_eq!(customer.short_name, "ACME METAIS");
        assert_eq!(customer.name, "ACME METAIS LTDA");
        assert_eq!(customer.address.as_deref(), Some("RUA A, 10, CENTRO"));
        assert_eq!(customer.cep.as_deref(), Some("13054-703"));
        assert!(!customer.geocoded);
        assert!(customer.lat.is_none());
    }

    #[test]
    fn customer_short_name_falls_back_to_full_name() {
        let customer = build_customer(&row(json!({ "Nome": "Acme Metais" })));
        assert_eq!(customer.short_name, "ACME METAIS");
    }

    #[test]
    fn order_inherits_geocoded_customer_coordinates() {
        let mut customer = build_customer(&row(json!({
            "Nome Abreviado": "ACME",
            "Nome": "ACME",
            "CEP": "13054-703",
        })));
        customer.lat = Some(-22.9);
        customer.lon = Some(-47.06);
        customer.geocoded = true;

        let order = build_order(
            &row(json!({ "Cliente": "acme", "Rota": "CAMPINAS 1" })),
            Some(&customer),
        );

        assert_eq!(order.customer_short_name, "ACME");
        assert_eq!(order.lat, Some(-22.9));
        assert!(order.geocoded);
        // customer CEP backfills the missing order CEP
        assert_eq!(order.cep.as_deref(), Some("13054-703"));
    }

    #[test]
    fn order_without_customer_coords_is_not_geocoded() {
        let customer = build_customer(&row(json!({ "Nome": "ACME" })));
        let order = build_order(&row(json!({ "Cliente": "ACME" })), Some(&customer));

        assert!(!order.geocoded);
        assert!(order.lat.is_none());
        assert!(order.cep.is_none());
    }

    #[test]
    fn zincolor_route_gets_the_default_cep() {
        let order = build_order(
            &row(json!({ "Cliente": "ACME", "Rota": "Entregas  Zincolor" })),
            None,
        );

        assert_eq!(order.rota_normalized.as_deref(), Some("ENTREGAS ZINCOLOR"));
        assert_eq!(order.cep.as_deref(), Some(overrides::DEFAULT_CEP));
    }

    #[test]
    fn unmatched_orders_are_deduplicated_and_capped() {
        let known: HashSet<String> = ["ACME".to_string()].into_iter().collect();

        let mut rows = vec![
            row(json!({ "Cliente": "ACME" })),
            row(json!({ "Cliente": "Desconhecida", "Rota": "CAMPINAS 1" })),
            row(json!({ "Cliente": "DESCONHECIDA" })),
        ];
        for i in 0..6 {
            rows.push(row(json!({ "Cliente": format!("Outra {}", i) })));
        }

        let unmatched = collect_unmatched(&rows, &known);
        assert_eq!(unmatched.len(), 5);
        assert_eq!(unmatched[0], "Desconhecida (rota CAMPINAS 1)");
        assert_eq!(unmatched[1], "Outra 0");
    }
}
