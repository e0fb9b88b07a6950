//! One-page A4 invoice rendered with printpdf's builtin Helvetica.
//!
//! Builtin PDF fonts only cover WinAnsi, so text is folded to ASCII before
//! it is placed on the page.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

use super::OrderConfirmation;
use super::email::payment_label;
use crate::config::InvoiceSupplier;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 25.0;
const ROW_HEIGHT: f32 = 6.0;
const MAX_NAME_CHARS: usize = 55;

/// Column x positions of the item table.
const COL_NAME: f32 = MARGIN_LEFT;
const COL_QTY: f32 = 125.0;
const COL_UNIT: f32 = 145.0;
const COL_TOTAL: f32 = 172.0;

/// Errors raised while rendering an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("PDF error: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Writes lines top-down, starting a new page when the bottom is reached.
struct Cursor<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Cursor<'_> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(fold_to_ascii(text), size, Mm(x), Mm(self.y), font);
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
        if self.y < MARGIN_BOTTOM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN_BOTTOM;
        }
    }
}

/// Render the invoice PDF for an order.
///
/// # Errors
///
/// Returns `InvoiceError::Pdf` if a font cannot be added or the document
/// cannot be serialized.
pub fn render_invoice(
    confirmation: &OrderConfirmation,
    supplier: &InvoiceSupplier,
) -> Result<Vec<u8>, InvoiceError> {
    let title = format!("Faktura {}", confirmation.order_id);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut c = Cursor {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - 20.0,
        regular,
        bold,
    };

    // Header
    c.text("FAKTURA", 20.0, MARGIN_LEFT, true);
    c.advance(9.0);
    c.text(
        &format!("Cislo objednavky: {}", confirmation.order_id),
        10.0,
        MARGIN_LEFT,
        false,
    );
    c.advance(5.0);
    c.text(
        &format!(
            "Datum vystaveni: {}",
            confirmation.placed_at.format("%d.%m.%Y")
        ),
        10.0,
        MARGIN_LEFT,
        false,
    );
    c.advance(12.0);

    // Supplier and customer side by side
    let customer = &confirmation.customer;
    let mut supplier_block = vec![supplier.name.clone()];
    supplier_block.extend(supplier.address_lines.iter().cloned());
    if let Some(id) = &supplier.company_id {
        supplier_block.push(format!("IC: {id}"));
    }
    let mut customer_block = vec![
        customer.full_name(),
        customer.address.clone(),
        format!("{} {}", customer.zip_code, customer.city),
        customer.email.to_string(),
    ];
    if let Some(phone) = &customer.phone {
        customer_block.push(phone.clone());
    }

    c.text("Dodavatel", 11.0, MARGIN_LEFT, true);
    c.text("Odberatel", 11.0, 110.0, true);
    c.advance(ROW_HEIGHT);
    for i in 0..supplier_block.len().max(customer_block.len()) {
        if let Some(line) = supplier_block.get(i) {
            c.text(line, 10.0, MARGIN_LEFT, false);
        }
        if let Some(line) = customer_block.get(i) {
            c.text(line, 10.0, 110.0, false);
        }
        c.advance(5.0);
    }
    c.advance(10.0);

    // Items
    c.text("Polozka", 10.0, COL_NAME, true);
    c.text("Ks", 10.0, COL_QTY, true);
    c.text("Cena/ks", 10.0, COL_UNIT, true);
    c.text("Celkem", 10.0, COL_TOTAL, true);
    c.advance(ROW_HEIGHT + 1.0);
    for line in &confirmation.lines {
        c.text(&truncate(&line.product_name), 10.0, COL_NAME, false);
        c.text(&line.quantity.to_string(), 10.0, COL_QTY, false);
        c.text(&line.unit_price.display_czk(), 10.0, COL_UNIT, false);
        c.text(&line.line_total.display_czk(), 10.0, COL_TOTAL, false);
        c.advance(ROW_HEIGHT);
    }
    c.advance(6.0);

    // Totals
    c.text("Mezisoucet", 10.0, COL_UNIT - 20.0, false);
    c.text(&confirmation.subtotal.display_czk(), 10.0, COL_TOTAL, false);
    c.advance(ROW_HEIGHT);
    if let Some(d) = &confirmation.discount {
        c.text(
            &format!("Sleva {} ({} %)", d.code, d.percent),
            10.0,
            COL_UNIT - 20.0,
            false,
        );
        c.text(&format!("-{}", d.amount.display_czk()), 10.0, COL_TOTAL, false);
        c.advance(ROW_HEIGHT);
    }
    c.text("Celkem k uhrade", 12.0, COL_UNIT - 20.0, true);
    c.text(&confirmation.total.display_czk(), 12.0, COL_TOTAL, true);
    c.advance(ROW_HEIGHT * 2.0);

    c.text(
        &format!("Zpusob platby: {}", payment_label(customer.payment_method)),
        10.0,
        MARGIN_LEFT,
        false,
    );

    drop(c);
    Ok(doc.save_to_bytes()?)
}

fn truncate(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        return name.to_string();
    }
    let mut out: String = name.chars().take(MAX_NAME_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Replace Czech diacritics with their base letters and drop anything else
/// outside printable ASCII.
fn fold_to_ascii(text: &str) -> String {
    text.chars()
        .filter_map(|ch| {
            let folded = match ch {
                'á' => 'a',
                'č' => 'c',
                'ď' => 'd',
                'é' | 'ě' => 'e',
                'í' => 'i',
                'ň' => 'n',
                'ó' => 'o',
                'ř' => 'r',
                'š' => 's',
                'ť' => 't',
                'ú' | 'ů' => 'u',
                'ý' => 'y',
                'ž' => 'z',
                'Á' => 'A',
                'Č' => 'C',
                'Ď' => 'D',
                'É' | 'Ě' => 'E',
                'Í' => 'I',
                'Ň' => 'N',
                'Ó' => 'O',
                'Ř' => 'R',
                'Š' => 'S',
                'Ť' => 'T',
                'Ú' | 'Ů' => 'U',
                'Ý' => 'Y',
                'Ž' => 'Z',
                '×' => 'x',
                c if c == ' ' || c.is_ascii_graphic() => c,
                c if c.is_whitespace() => ' ',
                _ => return None,
            };
            Some(folded)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::fixtures;

    #[test]
    fn test_fold_czech_text() {
        assert_eq!(fold_to_ascii("Příliš žluťoučký kůň"), "Prilis zlutoucky kun");
        assert_eq!(fold_to_ascii("599 Kč"), "599 Kc");
        assert_eq!(fold_to_ascii("a\u{1F680}b"), "ab");
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(80);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_NAME_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_render_produces_pdf() {
        let supplier = InvoiceSupplier {
            company_id: Some("12345678".into()),
            ..InvoiceSupplier::default()
        };
        let bytes = render_invoice(&fixtures::confirmation(), &supplier).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_paginates_long_orders() {
        let mut confirmation = fixtures::confirmation();
        let line = confirmation.lines[0].clone();
        confirmation.lines = std::iter::repeat_n(line, 80).collect();
        let bytes = render_invoice(&confirmation, &InvoiceSupplier::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
