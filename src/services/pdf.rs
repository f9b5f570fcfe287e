//! Procedurally laid-out CRA receipt attached to the approval email.
//!
//! Positions are expressed from the top of an A4 page in millimetres and
//! flipped when drawn, since PDF coordinates start bottom-left.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, NaiveDate, Weekday};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect, Rgb,
};
use rust_decimal::Decimal;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const PAGE_BREAK_Y: f32 = 270.0;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(#[from] printpdf::Error),
}

#[derive(Debug, Clone)]
pub struct PdfDay {
    pub date: NaiveDate,
    pub worked: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CraPdfData {
    /// `YYYY-MM`
    pub month: String,
    pub client_name: String,
    pub company_name: String,
    pub consultant: String,
    pub worked_days: Decimal,
    pub absent_days: Decimal,
    pub monthly_comment: Option<String>,
    pub days: Vec<PdfDay>,
    pub validated_at: String,
    pub validator_name: Option<String>,
}

const MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre", "octobre",
    "novembre", "décembre",
];

const SHORT_MONTHS: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.", "déc.",
];

/// `2024-03` -> `mars 2024`; unparseable input is returned as-is
pub fn month_label(month: &str) -> String {
    match NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d") {
        Ok(date) => format!("{} {}", MONTHS[date.month0() as usize], date.year()),
        Err(_) => month.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `lun. 4 mars`
fn short_date(date: NaiveDate) -> String {
    let weekday = match date.weekday() {
        Weekday::Mon => "lun.",
        Weekday::Tue => "mar.",
        Weekday::Wed => "mer.",
        Weekday::Thu => "jeu.",
        Weekday::Fri => "ven.",
        Weekday::Sat => "sam.",
        Weekday::Sun => "dim.",
    };
    format!("{} {} {}", weekday, date.day(), SHORT_MONTHS[date.month0() as usize])
}

/// Greedy word wrap on an estimated Helvetica advance
fn wrap(text: &str, width_mm: f32, font_size: f32) -> Vec<String> {
    let max_chars = ((width_mm / (font_size * 0.5 * 0.3528)) as usize).max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.5 * 0.3528
}

struct Page<'a> {
    layer: PdfLayerReference,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    italic: &'a IndirectFontRef,
}

enum Style {
    Regular,
    Bold,
    Italic,
}

impl Page<'_> {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, style: Style) {
        let font = match style {
            Style::Regular => self.regular,
            Style::Bold => self.bold,
            Style::Italic => self.italic,
        };
        self.layer.use_text(text, size, Mm(x), Mm(PAGE_HEIGHT - y), font);
    }

    fn centered(&self, text: &str, size: f32, y: f32, style: Style) {
        let x = (PAGE_WIDTH - text_width(text, size)) / 2.0;
        self.text(text, size, x.max(10.0), y, style);
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32, fill: (f32, f32, f32), mode: PaintMode) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(fill.0, fill.1, fill.2, None)));
        let rect = Rect::new(
            Mm(x),
            Mm(PAGE_HEIGHT - y - height),
            Mm(x + width),
            Mm(PAGE_HEIGHT - y),
        )
        .with_mode(mode);
        self.layer.add_rect(rect);
        self.layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    fn hline(&self, x1: f32, x2: f32, y: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(PAGE_HEIGHT - y)), false),
                (Point::new(Mm(x2), Mm(PAGE_HEIGHT - y)), false),
            ],
            is_closed: false,
        });
    }
}

/// Render the receipt, returned as a base64 payload ready for attachment
pub fn generate_cra_pdf(data: &CraPdfData) -> Result<String, PdfError> {
    let label = month_label(&data.month);
    let (doc, page_index, layer_index) =
        PdfDocument::new(format!("CRA {}", label), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "CRA");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let italic = doc.add_builtin_font(BuiltinFont::HelveticaOblique)?;

    let mut page = Page {
        layer: doc.get_page(page_index).get_layer(layer_index),
        regular: &regular,
        bold: &bold,
        italic: &italic,
    };
    let mut y = 20.0;

    page.centered("Compte-Rendu d'Activité", 20.0, y, Style::Bold);
    y += 10.0;
    page.centered(&capitalize(&label), 14.0, y, Style::Regular);

    y += 15.0;
    for (heading, value) in [
        ("Société :", data.company_name.as_str()),
        ("Client :", data.client_name.as_str()),
        ("Consultant :", data.consultant.as_str()),
    ] {
        page.text(heading, 10.0, 20.0, y, Style::Bold);
        page.text(value, 10.0, 50.0, y, Style::Regular);
        y += 7.0;
    }

    y += 8.0;
    page.rect(20.0, y, PAGE_WIDTH - 40.0, 25.0, (0.96, 0.96, 0.96), PaintMode::FillStroke);
    y += 10.0;
    page.text(&format!("Jours travaillés : {}", data.worked_days.normalize()), 11.0, 30.0, y, Style::Bold);
    page.text(
        &format!("Jours d'absence : {}", data.absent_days.normalize()),
        11.0,
        PAGE_WIDTH / 2.0 + 10.0,
        y,
        Style::Bold,
    );
    y += 8.0;
    page.text(
        &format!("Total : {} jours", (data.worked_days + data.absent_days).normalize()),
        11.0,
        30.0,
        y,
        Style::Regular,
    );

    if let Some(comment) = data.monthly_comment.as_deref().filter(|c| !c.trim().is_empty()) {
        y += 20.0;
        page.text("Commentaire mensuel :", 10.0, 20.0, y, Style::Bold);
        y += 6.0;
        for line in wrap(comment, PAGE_WIDTH - 40.0, 10.0) {
            page.text(&line, 10.0, 20.0, y, Style::Regular);
            y += 5.0;
        }
    }

    if !data.days.is_empty() {
        y += 15.0;
        page.text("Détail des jours :", 11.0, 20.0, y, Style::Bold);
        y += 8.0;
        page.rect(20.0, y - 4.0, PAGE_WIDTH - 40.0, 8.0, (0.9, 0.9, 0.9), PaintMode::Fill);
        page.text("Date", 9.0, 25.0, y, Style::Bold);
        page.text("Statut", 9.0, 70.0, y, Style::Bold);
        page.text("Commentaire", 9.0, 100.0, y, Style::Bold);
        y += 8.0;

        for day in &data.days {
            if y > PAGE_BREAK_Y {
                let (next_page, next_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "CRA");
                page.layer = doc.get_page(next_page).get_layer(next_layer);
                y = 20.0;
            }
            page.text(&short_date(day.date), 9.0, 25.0, y, Style::Regular);
            page.text(if day.worked { "Travaillé" } else { "Absent" }, 9.0, 70.0, y, Style::Regular);
            match day.comment.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(comment) => {
                    let lines = wrap(comment, 85.0, 9.0);
                    for (i, line) in lines.iter().enumerate() {
                        page.text(line, 9.0, 100.0, y + i as f32 * 4.0, Style::Regular);
                    }
                    y += (lines.len() as f32 * 4.0).max(6.0);
                }
                None => y += 6.0,
            }
        }
    }

    let footer_y = PAGE_HEIGHT - 30.0;
    page.hline(20.0, PAGE_WIDTH - 20.0, footer_y);
    let validation_line = match &data.validator_name {
        Some(name) => format!("Document validé par {} le {}", name, data.validated_at),
        None => format!("Document validé le {}", data.validated_at),
    };
    page.centered(&validation_line, 9.0, footer_y + 8.0, Style::Italic);
    page.centered(
        "Ce document a été généré automatiquement par Wavy Services",
        8.0,
        footer_y + 13.0,
        Style::Italic,
    );

    let bytes = doc.save_to_bytes()?;
    Ok(STANDARD.encode(bytes))
}

/// `CRA_Jean_Dupont_2024-03.pdf`
pub fn pdf_filename(consultant: &str, month: &str) -> String {
    let name: String = consultant
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("CRA_{}_{}.pdf", name, month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CraPdfData {
        CraPdfData {
            month: "2024-03".to_string(),
            client_name: "Acme".to_string(),
            company_name: "Wavy Services".to_string(),
            consultant: "Jean Dupont".to_string(),
            worked_days: Decimal::new(185, 1),
            absent_days: Decimal::from(2),
            monthly_comment: Some("Mission de migration, livraison du lot 2.".to_string()),
            days: (1..=28)
                .map(|d| PdfDay {
                    date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    worked: d % 7 != 0,
                    comment: (d == 3).then(|| "Réunion de lancement chez le client".to_string()),
                })
                .collect(),
            validated_at: "15/04/2024".to_string(),
            validator_name: None,
        }
    }

    #[test]
    fn renders_base64_pdf() {
        let encoded = generate_cra_pdf(&sample()).unwrap();
        // "%PDF-" once encoded
        assert!(encoded.starts_with("JVBERi0"));
    }

    #[test]
    fn french_month_and_day_labels() {
        assert_eq!(month_label("2024-03"), "mars 2024");
        assert_eq!(month_label("2024-12"), "décembre 2024");
        assert_eq!(month_label("bad"), "bad");
        assert_eq!(capitalize("août 2024"), "Août 2024");
        assert_eq!(short_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()), "lun. 4 mars");
    }

    #[test]
    fn filename_uses_underscores() {
        assert_eq!(pdf_filename("Jean  Dupont", "2024-03"), "CRA_Jean_Dupont_2024-03.pdf");
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("un deux trois quatre cinq six sept huit neuf dix", 20.0, 9.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
    }
}
