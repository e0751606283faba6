//! Text proposal rendering

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::estimate::Estimate;
use crate::core::line_item::format_money;
use crate::proposal::kits::ProposalLine;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Template used by [`ProposalRenderer::render`]
pub const PROPOSAL_TEMPLATE: &str = "proposal.txt.tera";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    Render(String),
}

#[derive(Serialize)]
struct CustomerView<'a> {
    name: &'a str,
    address: &'a str,
    phone: Option<&'a str>,
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct LineView<'a> {
    name: &'a str,
    description: Option<&'a str>,
    members: &'a [String],
}

impl<'a> From<&'a ProposalLine> for LineView<'a> {
    fn from(line: &'a ProposalLine) -> Self {
        Self {
            name: &line.name,
            description: line.description.as_deref(),
            members: &line.members,
        }
    }
}

#[derive(Serialize)]
struct BuildingView<'a> {
    name: &'a str,
    roof_system: &'a str,
}

#[derive(Serialize)]
struct ProposalView<'a> {
    customer: CustomerView<'a>,
    date: String,
    estimate_id: &'a str,
    intro_letter: Option<&'a str>,
    lines: Vec<LineView<'a>>,
    add_ons: Vec<LineView<'a>>,
    buildings: Vec<BuildingView<'a>>,
    sell_price: String,
    sales_tax_percent: String,
    sales_tax: String,
    final_price: String,
}

/// Renders organized proposal lines with the embedded template
pub struct ProposalRenderer {
    tera: Tera,
}

impl ProposalRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let source = std::str::from_utf8(&content.data)
                    .map_err(|e| RenderError::Render(format!("{}: {}", filename, e)))?;
                tera.add_raw_template(filename, source)
                    .map_err(|e| RenderError::Render(e.to_string()))?;
            }
        }
        if !tera.get_template_names().any(|n| n == PROPOSAL_TEMPLATE) {
            return Err(RenderError::NotFound(PROPOSAL_TEMPLATE.to_string()));
        }
        Ok(Self { tera })
    }

    /// Render a customer proposal
    ///
    /// Lines carry no individual prices; the investment section shows the
    /// estimate's sell price, tax and final price.
    pub fn render(&self, estimate: &Estimate, lines: &[ProposalLine]) -> Result<String, RenderError> {
        let (add_ons, scope): (Vec<&ProposalLine>, Vec<&ProposalLine>) =
            lines.iter().partition(|l| l.is_optional);

        let view = ProposalView {
            customer: CustomerView {
                name: &estimate.customer_info.name,
                address: &estimate.customer_info.address,
                phone: estimate.customer_info.phone.as_deref(),
                email: estimate.customer_info.email.as_deref(),
            },
            date: estimate.generated_at.format("%B %-d, %Y").to_string(),
            estimate_id: &estimate.id,
            intro_letter: estimate.intro_letter.as_deref().filter(|s| !s.trim().is_empty()),
            lines: scope.into_iter().map(LineView::from).collect(),
            add_ons: add_ons.into_iter().map(LineView::from).collect(),
            buildings: estimate
                .building_subtotals
                .iter()
                .map(|b| BuildingView {
                    name: &b.name,
                    roof_system: &b.roof_system,
                })
                .collect(),
            sell_price: format_money(estimate.sell_price),
            sales_tax_percent: estimate.sales_tax_percent.to_string(),
            sales_tax: format_money(estimate.sales_tax_amount),
            final_price: format_money(estimate.final_price),
        };

        let context =
            tera::Context::from_serialize(&view).map_err(|e| RenderError::Render(e.to_string()))?;
        self.tera
            .render(PROPOSAL_TEMPLATE, &context)
            .map_err(|e| RenderError::Render(e.to_string()))
    }
}
