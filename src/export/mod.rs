//! Spreadsheet rendering of report rows.

pub mod workbook;

use crate::types::Bulan;

pub use workbook::render_laporan;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// What the workbook covers; drives the title rows and the file name
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub bulan: Option<Bulan>,
    pub tahun: i32,
    /// `None` when exporting every clinic
    pub puskesmas: Option<String>,
}

impl ExportMeta {
    pub fn periode(&self) -> String {
        match self.bulan {
            Some(bulan) => format!("{} {}", bulan, self.tahun),
            None => format!("Tahun {}", self.tahun),
        }
    }

    pub fn filename(&self) -> String {
        let scope = self
            .puskesmas
            .as_deref()
            .map(slug)
            .unwrap_or_else(|| "semua_puskesmas".to_string());
        match self.bulan {
            Some(bulan) => format!("laporan_evkin_{}_{}_{}.xlsx", scope, bulan.as_str().to_lowercase(), self.tahun),
            None => format!("laporan_evkin_{}_{}.xlsx", scope, self.tahun),
        }
    }
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_names_clinic_and_period() {
        let meta = ExportMeta {
            bulan: Some(Bulan::Januari),
            tahun: 2025,
            puskesmas: Some("Puskesmas Cibadak (Induk)".into()),
        };
        assert_eq!(meta.filename(), "laporan_evkin_puskesmas_cibadak_induk_januari_2025.xlsx");
        assert_eq!(meta.periode(), "Januari 2025");
    }

    #[test]
    fn filename_for_all_clinics_whole_year() {
        let meta = ExportMeta {
            bulan: None,
            tahun: 2024,
            puskesmas: None,
        };
        assert_eq!(meta.filename(), "laporan_evkin_semua_puskesmas_2024.xlsx");
        assert_eq!(meta.periode(), "Tahun 2024");
    }
}
