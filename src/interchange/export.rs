//! CSV sheet export and the blank template

use csv::Writer;

use crate::core::estimate::Estimate;
use crate::core::line_item::{round_cents, LineItem};
use crate::interchange::columns::{Column, INTRO_CATEGORY};

/// Note written on optional rows so they re-import as add-ons
pub const OPTIONAL_NOTE: &str = "Optional";

fn format_number(value: f64) -> String {
    let rounded = round_cents(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn item_row(estimate: &Estimate, line: &LineItem, note: &str) -> [String; 10] {
    [
        estimate.customer_info.name.clone(),
        estimate.customer_info.address.clone(),
        line.name().to_string(),
        line.item.proposal_description.clone().unwrap_or_default(),
        format_number(line.quantity),
        line.unit().to_string(),
        format_number(line.price()),
        format_number(line.total),
        line.category().to_string(),
        note.to_string(),
    ]
}

/// Serialize an estimate's items as a sheet that imports back to the same lines
///
/// The sundries line is not written; it is recomputed on import.
pub fn export_csv(estimate: &Estimate) -> Result<String, csv::Error> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(Column::ALL.iter().map(|c| c.header()))?;

    if let Some(intro) = estimate.intro_letter.as_deref().filter(|s| !s.trim().is_empty()) {
        writer.write_record([
            estimate.customer_info.name.as_str(),
            estimate.customer_info.address.as_str(),
            "",
            intro,
            "",
            "",
            "",
            "",
            INTRO_CATEGORY,
            "",
        ])?;
    }

    for line in &estimate.line_items {
        writer.write_record(item_row(estimate, line, ""))?;
    }
    for line in &estimate.optional_items {
        writer.write_record(item_row(estimate, line, OPTIONAL_NOTE))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A filled-in example sheet showing every column
pub fn template_csv() -> String {
    let rows = [
        Column::ALL.iter().map(|c| c.header()).collect::<Vec<_>>().join(","),
        "Jordan Reyes,88 Cedar Hollow Rd,,Thank you for considering us for your new roof.,,,,,intro,"
            .to_string(),
        "Jordan Reyes,88 Cedar Hollow Rd,Brava Field Tile,Synthetic slate-look roof tile,28,bundle,43.25,1211,materials,"
            .to_string(),
        "Jordan Reyes,88 Cedar Hollow Rd,Ice & Water Shield,,2,roll,118,236,materials,".to_string(),
        "Jordan Reyes,88 Cedar Hollow Rd,Roofing Labor,,30,square,325,9750,labor,".to_string(),
        "Jordan Reyes,88 Cedar Hollow Rd,Debris Haulaway & Landfill,,1,flat-fee,650,650,equipment,"
            .to_string(),
        "Jordan Reyes,88 Cedar Hollow Rd,Snow Guards,,20,each,14,280,accessories,Optional"
            .to_string(),
    ];
    let mut out = rows.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cascade::FinancialSettings;
    use crate::core::catalog::PriceItem;
    use crate::core::category::{Category, Unit};
    use crate::core::estimate::{CustomerInfo, EstimateInput};
    use crate::interchange::columns::template_header;
    use crate::interchange::import::import_csv;

    fn estimate() -> Estimate {
        let mut tile = PriceItem::new(
            "brava-field-tile",
            "Brava Field Tile",
            Unit::Bundle,
            43.25,
            Category::Materials,
        );
        tile.proposal_description = Some("Slate-look tile, \"Class 4\" rated".to_string());
        let mut input = EstimateInput::new(vec![
            LineItem::new(tile, 28.0),
            LineItem::new(
                PriceItem::new("roofing-labor", "Roofing Labor", Unit::Square, 325.0, Category::Labor),
                30.0,
            ),
        ]);
        input.optional_items = vec![LineItem::new(
            PriceItem::new("snow-guards", "Snow Guards", Unit::Each, 14.0, Category::Accessories),
            20.0,
        )
        .optional()];
        input.customer_info = CustomerInfo {
            name: "Dana Whitfield".to_string(),
            address: "14 Larch Lane, Unit 2".to_string(),
            ..Default::default()
        };
        input.intro_letter = Some("Thanks for having us out.".to_string());
        Estimate::build(input, &FinancialSettings::default()).unwrap()
    }

    #[test]
    fn test_export_layout() {
        let csv = export_csv(&estimate()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], template_header());
        assert!(lines[1].ends_with(",intro,"));
        assert!(lines[2].contains("Brava Field Tile"));
        assert!(lines[2].contains(",1211,materials,"));
        assert!(lines[4].ends_with(",accessories,Optional"));
        assert!(!csv.contains("Consumables & Hardware"));
    }

    #[test]
    fn test_export_reimports_to_same_figures() {
        let original = estimate();
        let csv = export_csv(&original).unwrap();
        let reimported = import_csv(&csv, None, &original.settings()).unwrap();

        assert_eq!(reimported.line_items.len(), original.line_items.len());
        assert_eq!(reimported.optional_items.len(), 1);
        assert_eq!(reimported.customer_info.address, "14 Larch Lane, Unit 2");
        assert_eq!(reimported.intro_letter, original.intro_letter);
        assert_eq!(
            reimported.line_items[0].item.proposal_description,
            original.line_items[0].item.proposal_description
        );
        assert!((reimported.final_price - original.final_price).abs() < 0.01);
    }

    #[test]
    fn test_template_starts_with_header() {
        let template = template_csv();
        assert!(template.starts_with(&template_header()));
        assert_eq!(template.lines().count(), 7);
    }
}
