use shared::domain::Warehouse;

/// Case-insensitive substring match over number, description and short address.
///
/// Blank text returns the whole list in its original order.
pub fn filter_warehouses<'a>(warehouses: &'a [Warehouse], text: &str) -> Vec<&'a Warehouse> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return warehouses.iter().collect();
    }

    warehouses
        .iter()
        .filter(|warehouse| {
            warehouse.number.to_string().contains(&needle)
                || warehouse.description.to_lowercase().contains(&needle)
                || warehouse.short_address.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use shared::domain::WarehouseRef;

    use super::*;

    fn warehouse(number: u32, description: &str, short_address: &str) -> Warehouse {
        Warehouse {
            warehouse_ref: WarehouseRef::new(format!("wh-{number}")),
            number,
            description: description.to_string(),
            short_address: short_address.to_string(),
            category_of_warehouse: "Branch".to_string(),
        }
    }

    fn sample() -> Vec<Warehouse> {
        vec![
            warehouse(1, "Відділення №1: вул. Хрещатик, 22", "Київ, Хрещатик, 22"),
            warehouse(15, "Відділення №15: просп. Перемоги, 5", "Київ, Перемоги, 5"),
            warehouse(210, "Поштомат №210: вул. Саксаганського, 1", "Київ, Саксаганського, 1"),
        ]
    }

    #[test]
    fn blank_text_keeps_original_list_and_order() {
        let list = sample();
        for text in ["", "   "] {
            let filtered: Vec<Warehouse> =
                filter_warehouses(&list, text).into_iter().cloned().collect();
            assert_eq!(filtered, list);
        }
    }

    #[test]
    fn matches_number_description_and_short_address_case_insensitively() {
        let list = sample();
        let numbers = |text: &str| {
            filter_warehouses(&list, text)
                .into_iter()
                .map(|w| w.number)
                .collect::<Vec<_>>()
        };
        assert_eq!(numbers("1"), vec![1, 15, 210]);
        assert_eq!(numbers("21"), vec![210]);
        assert_eq!(numbers("ХРЕЩАТИК"), vec![1]);
        assert_eq!(numbers("перемоги, 5"), vec![15]);
        assert!(numbers("Львів").is_empty());
    }
}
