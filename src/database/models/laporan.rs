use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::capaian::capaian;
use crate::types::{Bulan, LaporanStatus};

/// One report row: clinic × sub kegiatan × funding source × month × year
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Laporan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sub_kegiatan_id: Uuid,
    pub sumber_anggaran_id: Uuid,
    pub satuan_id: Uuid,
    pub bulan: Bulan,
    pub tahun: i32,
    pub target_k: Decimal,
    pub realisasi_k: Decimal,
    pub angkas: Decimal,
    pub target_rp: Decimal,
    pub realisasi_rp: Decimal,
    pub permasalahan: Option<String>,
    pub upaya: Option<String>,
    pub status: LaporanStatus,
    pub catatan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report row joined with the names of everything it references
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LaporanDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub laporan: Laporan,
    pub username: String,
    pub nama_puskesmas: Option<String>,
    pub kegiatan_id: Uuid,
    pub kegiatan_kode: String,
    pub kegiatan_nama: String,
    pub sub_kegiatan_kode: String,
    pub sub_kegiatan_nama: String,
    pub indikator: Option<String>,
    pub sumber_anggaran_nama: String,
    pub satuan_nama: String,
}

/// Column list matching [`LaporanDetail`]; callers append their own WHERE/ORDER.
pub const LAPORAN_DETAIL_SELECT: &str = r#"
    SELECT l.*,
           u.username, u.nama_puskesmas,
           k.id AS kegiatan_id, k.kode AS kegiatan_kode, k.nama AS kegiatan_nama,
           sk.kode AS sub_kegiatan_kode, sk.nama AS sub_kegiatan_nama, sk.indikator,
           sa.nama AS sumber_anggaran_nama,
           s.nama AS satuan_nama
    FROM laporan l
    JOIN users u ON u.id = l.user_id
    JOIN sub_kegiatan sk ON sk.id = l.sub_kegiatan_id
    JOIN kegiatan k ON k.id = sk.kegiatan_id
    JOIN sumber_anggaran sa ON sa.id = l.sumber_anggaran_id
    JOIN satuan s ON s.id = l.satuan_id
"#;

/// API view of a report row with derived achievement percentages
#[derive(Debug, Clone, Serialize)]
pub struct LaporanView {
    #[serde(flatten)]
    pub detail: LaporanDetail,
    pub capaian_k: Decimal,
    pub capaian_pagu: Decimal,
}

impl Laporan {
    pub fn capaian_k(&self) -> Decimal {
        capaian(self.realisasi_k, self.target_k)
    }

    pub fn capaian_pagu(&self) -> Decimal {
        capaian(self.realisasi_rp, self.target_rp)
    }
}

impl From<LaporanDetail> for LaporanView {
    fn from(detail: LaporanDetail) -> Self {
        let capaian_k = detail.laporan.capaian_k();
        let capaian_pagu = detail.laporan.capaian_pagu();
        Self {
            detail,
            capaian_k,
            capaian_pagu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target_k: i64, realisasi_k: i64, target_rp: i64, realisasi_rp: i64) -> Laporan {
        Laporan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            sub_kegiatan_id: Uuid::new_v4(),
            sumber_anggaran_id: Uuid::new_v4(),
            satuan_id: Uuid::new_v4(),
            bulan: Bulan::Januari,
            tahun: 2025,
            target_k: Decimal::from(target_k),
            realisasi_k: Decimal::from(realisasi_k),
            angkas: Decimal::ZERO,
            target_rp: Decimal::from(target_rp),
            realisasi_rp: Decimal::from(realisasi_rp),
            permasalahan: None,
            upaya: None,
            status: LaporanStatus::Tersimpan,
            catatan: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn half_realised_performance_is_fifty_percent() {
        let row = sample(100, 50, 0, 0);
        assert_eq!(row.capaian_k(), Decimal::new(5000, 2));
    }

    #[test]
    fn zero_budget_target_gives_zero_capaian() {
        let row = sample(10, 10, 0, 250_000);
        assert_eq!(row.capaian_pagu(), Decimal::ZERO);
    }

    #[test]
    fn view_serializes_flat_with_capaian() {
        let detail = LaporanDetail {
            laporan: sample(100, 50, 2_000_000, 500_000),
            username: "pkm_a".into(),
            nama_puskesmas: Some("Puskesmas A".into()),
            kegiatan_id: Uuid::new_v4(),
            kegiatan_kode: "1.02.02".into(),
            kegiatan_nama: "Pelayanan Kesehatan".into(),
            sub_kegiatan_kode: "1.02.02.2.01".into(),
            sub_kegiatan_nama: "Imunisasi".into(),
            indikator: None,
            sumber_anggaran_nama: "BOK".into(),
            satuan_nama: "Orang".into(),
        };
        let value = serde_json::to_value(LaporanView::from(detail)).unwrap();
        assert_eq!(value["bulan"], "Januari");
        assert_eq!(value["status"], "tersimpan");
        assert_eq!(value["sub_kegiatan_nama"], "Imunisasi");
        assert_eq!(value["capaian_k"], "50.00");
        assert_eq!(value["capaian_pagu"], "25.00");
    }
}
