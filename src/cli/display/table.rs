//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table to string with a count header.
pub fn render_list(entity_name: &str, table: Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let count_line = format!(
        "{} {}:",
        console::style(total).bold(),
        if total == 1 {
            entity_name.to_string()
        } else {
            format!("{entity_name}s")
        }
    );
    format!("{count_line}\n{table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_list() {
        let table = list_table(&["id", "name"]);
        assert_eq!(render_list("location", table, 0), "No locations found.");
    }

    #[test]
    fn test_render_list_includes_rows() {
        console::set_colors_enabled(false);
        let mut table = list_table(&["id", "name"]);
        table.add_row(vec!["0b7c6a4e", "Kyoto"]);
        let rendered = render_list("location", table, 1);
        assert!(rendered.starts_with("1 location:"));
        assert!(rendered.contains("NAME"));
        assert!(rendered.contains("Kyoto"));
    }
}
