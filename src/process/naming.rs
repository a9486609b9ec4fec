use crate::process::codec::PARQUET_EXTENSION;

const SOURCE_SUFFIX: &str = ".csv";

/// Object key with one trailing `.csv` (any case) removed.
pub fn base_name(object_key: &str) -> &str {
    let split = object_key.len().saturating_sub(SOURCE_SUFFIX.len());
    match object_key.get(split..) {
        Some(suffix) if split > 0 && suffix.eq_ignore_ascii_case(SOURCE_SUFFIX) => {
            &object_key[..split]
        }
        _ => object_key,
    }
}

/// Destination key for a source object: `tables/<base>/<base>.parquet`.
pub fn output_key(object_key: &str) -> String {
    let base = base_name(object_key);
    format!("tables/{base}/{base}.{PARQUET_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_key() {
        assert_eq!(output_key("orders.csv"), "tables/orders/orders.parquet");
        assert_eq!(output_key("orders.csv"), output_key("orders.csv"));
        assert_eq!(
            output_key("olist_orders_dataset.CSV"),
            "tables/olist_orders_dataset/olist_orders_dataset.parquet"
        );
    }

    #[test]
    fn test_base_name_only_strips_trailing_suffix() {
        assert_eq!(base_name("orders"), "orders");
        assert_eq!(base_name("my.csv.backup"), "my.csv.backup");
        assert_eq!(base_name("a.csv.csv"), "a.csv");
        assert_eq!(base_name(".csv"), ".csv");
        assert_eq!(base_name("raw/2024/sales.csv"), "raw/2024/sales");
    }

    #[test]
    fn test_multibyte_keys() {
        assert_eq!(base_name("vendas_são.csv"), "vendas_são");
        assert_eq!(base_name("é"), "é");
    }
}
