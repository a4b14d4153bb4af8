use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use uuid::Uuid;

use super::{ExportError, ExportMeta};
use crate::capaian::{capaian, to_f64};
use crate::database::models::LaporanView;
use crate::types::Bulan;

// Column layout
const COL_NO: u16 = 0;
const COL_SUB_KEGIATAN: u16 = 1;
const COL_SUMBER: u16 = 2;
const COL_SATUAN: u16 = 3;
const COL_TARGET_K: u16 = 4;
const COL_TARGET_RP: u16 = 5;
const COL_ANGKAS: u16 = 6;
const COL_REALISASI_K: u16 = 7;
const COL_REALISASI_RP: u16 = 8;
const COL_CAPAIAN_K: u16 = 9;
const COL_CAPAIAN_RP: u16 = 10;
const COL_PERMASALAHAN: u16 = 11;
const COL_UPAYA: u16 = 12;
const COL_STATUS: u16 = 13;
const LAST_COL: u16 = COL_STATUS;

const COLUMN_WIDTHS: [(u16, f64); 14] = [
    (COL_NO, 5.0),
    (COL_SUB_KEGIATAN, 42.0),
    (COL_SUMBER, 16.0),
    (COL_SATUAN, 11.0),
    (COL_TARGET_K, 10.0),
    (COL_TARGET_RP, 16.0),
    (COL_ANGKAS, 16.0),
    (COL_REALISASI_K, 10.0),
    (COL_REALISASI_RP, 16.0),
    (COL_CAPAIAN_K, 10.0),
    (COL_CAPAIAN_RP, 10.0),
    (COL_PERMASALAHAN, 30.0),
    (COL_UPAYA, 30.0),
    (COL_STATUS, 13.0),
];

struct Formats {
    title: Format,
    subtitle: Format,
    header: Format,
    clinic_group: Format,
    month_group: Format,
    kegiatan_group: Format,
    text: Format,
    center: Format,
    count: Format,
    money: Format,
    percent: Format,
    total_label: Format,
    total_money: Format,
    total_percent: Format,
}

impl Formats {
    fn new() -> Self {
        let cell = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::VerticalCenter);
        let total = cell.clone().set_bold().set_background_color(Color::RGB(0xFFF2CC));

        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            subtitle: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: cell
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_text_wrap()
                .set_background_color(Color::RGB(0xD9E1F2)),
            clinic_group: cell.clone().set_bold().set_background_color(Color::RGB(0xBDD7EE)),
            month_group: cell.clone().set_bold().set_background_color(Color::RGB(0xE2EFDA)),
            kegiatan_group: cell.clone().set_bold().set_background_color(Color::RGB(0xEDEDED)),
            text: cell.clone().set_text_wrap(),
            center: cell.clone().set_align(FormatAlign::Center),
            count: cell.clone().set_num_format("#,##0.##"),
            money: cell.clone().set_num_format("#,##0"),
            percent: cell.clone().set_num_format("0.00"),
            total_label: total.clone().set_align(FormatAlign::Center),
            total_money: total.clone().set_num_format("#,##0"),
            total_percent: total.set_num_format("0.00"),
        }
    }
}

/// Running sums for the totals row
#[derive(Default)]
struct Sums {
    target_k: Decimal,
    target_rp: Decimal,
    angkas: Decimal,
    realisasi_k: Decimal,
    realisasi_rp: Decimal,
}

impl Sums {
    fn add(&mut self, row: &LaporanView) {
        let l = &row.detail.laporan;
        self.target_k += l.target_k;
        self.target_rp += l.target_rp;
        self.angkas += l.angkas;
        self.realisasi_k += l.realisasi_k;
        self.realisasi_rp += l.realisasi_rp;
    }
}

/// One worksheet line below the header
#[derive(Debug)]
enum Line<'a> {
    Clinic(String),
    Month(Bulan, i32),
    Kegiatan(String),
    Data(u32, &'a LaporanView),
}

/// Lay rows out under their group headings.
///
/// Rows are expected in report order (clinic, tahun, bulan, kegiatan, sub
/// kegiatan). A clinic heading is added when the export spans all clinics and
/// a month heading when it spans a whole year. Numbering restarts under each
/// clinic and month.
fn layout<'a>(rows: &'a [LaporanView], meta: &ExportMeta) -> Vec<Line<'a>> {
    let group_by_clinic = meta.puskesmas.is_none();
    let group_by_month = meta.bulan.is_none();
    let mut lines = Vec::with_capacity(rows.len() * 2);
    let mut current_clinic: Option<Uuid> = None;
    let mut current_month: Option<(i32, Bulan)> = None;
    let mut current_kegiatan: Option<Uuid> = None;
    let mut number = 0u32;

    for item in rows {
        let d = &item.detail;
        let period = (d.laporan.tahun, d.laporan.bulan);

        if group_by_clinic && current_clinic != Some(d.laporan.user_id) {
            current_clinic = Some(d.laporan.user_id);
            current_month = None;
            current_kegiatan = None;
            number = 0;
            let label = d.nama_puskesmas.as_deref().unwrap_or(&d.username);
            lines.push(Line::Clinic(label.to_uppercase()));
        }

        if group_by_month && current_month != Some(period) {
            current_month = Some(period);
            current_kegiatan = None;
            number = 0;
            lines.push(Line::Month(d.laporan.bulan, d.laporan.tahun));
        }

        if current_kegiatan != Some(d.kegiatan_id) {
            current_kegiatan = Some(d.kegiatan_id);
            lines.push(Line::Kegiatan(format!("{} {}", d.kegiatan_kode, d.kegiatan_nama)));
        }

        number += 1;
        lines.push(Line::Data(number, item));
    }

    lines
}

/// Render report rows into an `.xlsx` buffer.
pub fn render_laporan(rows: &[LaporanView], meta: &ExportMeta) -> Result<Vec<u8>, ExportError> {
    let fmt = Formats::new();
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("Laporan")?;

    for (col, width) in COLUMN_WIDTHS {
        ws.set_column_width(col, width)?;
    }

    let mut row = write_title(ws, meta, &fmt)?;
    row = write_header(ws, row, &fmt)?;
    ws.set_freeze_panes(row, 0)?;

    if rows.is_empty() {
        ws.merge_range(row, 0, row, LAST_COL, "Tidak ada data laporan", &fmt.center)?;
        row += 1;
    }

    let mut sums = Sums::default();
    for line in layout(rows, meta) {
        match line {
            Line::Clinic(label) => {
                ws.merge_range(row, 0, row, LAST_COL, &label, &fmt.clinic_group)?;
            }
            Line::Month(bulan, tahun) => {
                ws.merge_range(row, 0, row, LAST_COL, &format!("{} {}", bulan, tahun), &fmt.month_group)?;
            }
            Line::Kegiatan(label) => {
                ws.merge_range(row, 0, row, LAST_COL, &label, &fmt.kegiatan_group)?;
            }
            Line::Data(number, item) => {
                write_data_row(ws, row, number, item, &fmt)?;
                sums.add(item);
            }
        }
        row += 1;
    }

    write_totals(ws, row, &sums, &fmt)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_title(ws: &mut Worksheet, meta: &ExportMeta, fmt: &Formats) -> Result<u32, ExportError> {
    ws.set_row_height(0, 24)?;
    ws.merge_range(0, 0, 0, LAST_COL, "LAPORAN EVALUASI KINERJA PUSKESMAS", &fmt.title)?;
    ws.merge_range(1, 0, 1, LAST_COL, &format!("Periode: {}", meta.periode()), &fmt.subtitle)?;
    let scope = meta.puskesmas.as_deref().unwrap_or("Semua Puskesmas");
    ws.merge_range(2, 0, 2, LAST_COL, &format!("Puskesmas: {}", scope), &fmt.subtitle)?;
    // blank spacer row
    Ok(4)
}

/// Two header rows: grouped columns share a merged top cell, the rest span both rows.
fn write_header(ws: &mut Worksheet, top: u32, fmt: &Formats) -> Result<u32, ExportError> {
    let bottom = top + 1;
    let h = &fmt.header;

    for (col, label) in [
        (COL_NO, "No"),
        (COL_SUB_KEGIATAN, "Kegiatan / Sub Kegiatan"),
        (COL_SUMBER, "Sumber Anggaran"),
        (COL_SATUAN, "Satuan"),
        (COL_ANGKAS, "Angkas (Rp)"),
        (COL_PERMASALAHAN, "Permasalahan"),
        (COL_UPAYA, "Upaya"),
        (COL_STATUS, "Status"),
    ] {
        ws.merge_range(top, col, bottom, col, label, h)?;
    }

    for (first, label, sub) in [
        (COL_TARGET_K, "Target", ["K", "Rp"]),
        (COL_REALISASI_K, "Realisasi", ["K", "Rp"]),
        (COL_CAPAIAN_K, "Capaian", ["K (%)", "Rp (%)"]),
    ] {
        ws.merge_range(top, first, top, first + 1, label, h)?;
        ws.write_string_with_format(bottom, first, sub[0], h)?;
        ws.write_string_with_format(bottom, first + 1, sub[1], h)?;
    }

    Ok(bottom + 1)
}

fn write_data_row(ws: &mut Worksheet, row: u32, number: u32, item: &LaporanView, fmt: &Formats) -> Result<(), ExportError> {
    let d = &item.detail;
    let l = &d.laporan;

    ws.write_number_with_format(row, COL_NO, number, &fmt.center)?;
    ws.write_string_with_format(row, COL_SUB_KEGIATAN, format!("{} {}", d.sub_kegiatan_kode, d.sub_kegiatan_nama), &fmt.text)?;
    ws.write_string_with_format(row, COL_SUMBER, &d.sumber_anggaran_nama, &fmt.text)?;
    ws.write_string_with_format(row, COL_SATUAN, &d.satuan_nama, &fmt.center)?;
    ws.write_number_with_format(row, COL_TARGET_K, to_f64(l.target_k), &fmt.count)?;
    ws.write_number_with_format(row, COL_TARGET_RP, to_f64(l.target_rp), &fmt.money)?;
    ws.write_number_with_format(row, COL_ANGKAS, to_f64(l.angkas), &fmt.money)?;
    ws.write_number_with_format(row, COL_REALISASI_K, to_f64(l.realisasi_k), &fmt.count)?;
    ws.write_number_with_format(row, COL_REALISASI_RP, to_f64(l.realisasi_rp), &fmt.money)?;
    ws.write_number_with_format(row, COL_CAPAIAN_K, to_f64(item.capaian_k), &fmt.percent)?;
    ws.write_number_with_format(row, COL_CAPAIAN_RP, to_f64(item.capaian_pagu), &fmt.percent)?;
    ws.write_string_with_format(row, COL_PERMASALAHAN, l.permasalahan.as_deref().unwrap_or(""), &fmt.text)?;
    ws.write_string_with_format(row, COL_UPAYA, l.upaya.as_deref().unwrap_or(""), &fmt.text)?;
    ws.write_string_with_format(row, COL_STATUS, l.status.as_str(), &fmt.center)?;
    Ok(())
}

fn write_totals(ws: &mut Worksheet, row: u32, sums: &Sums, fmt: &Formats) -> Result<(), ExportError> {
    ws.merge_range(row, COL_NO, row, COL_SATUAN, "TOTAL", &fmt.total_label)?;
    ws.write_number_with_format(row, COL_TARGET_K, to_f64(sums.target_k), &fmt.total_money)?;
    ws.write_number_with_format(row, COL_TARGET_RP, to_f64(sums.target_rp), &fmt.total_money)?;
    ws.write_number_with_format(row, COL_ANGKAS, to_f64(sums.angkas), &fmt.total_money)?;
    ws.write_number_with_format(row, COL_REALISASI_K, to_f64(sums.realisasi_k), &fmt.total_money)?;
    ws.write_number_with_format(row, COL_REALISASI_RP, to_f64(sums.realisasi_rp), &fmt.total_money)?;
    ws.write_number_with_format(
        row,
        COL_CAPAIAN_K,
        to_f64(capaian(sums.realisasi_k, sums.target_k)),
        &fmt.total_percent,
    )?;
    ws.write_number_with_format(
        row,
        COL_CAPAIAN_RP,
        to_f64(capaian(sums.realisasi_rp, sums.target_rp)),
        &fmt.total_percent,
    )?;
    ws.merge_range(row, COL_PERMASALAHAN, row, LAST_COL, "", &fmt.total_label)?;
    Ok(())
}
