pub mod assignment;
pub mod kegiatan;
pub mod laporan;
pub mod master;
pub mod user;

pub use assignment::{PuskesmasSubKegiatan, SubKegiatanSumberAnggaran};
pub use kegiatan::{Kegiatan, SubKegiatan};
pub use laporan::{Laporan, LaporanDetail, LaporanView};
pub use master::{Satuan, SumberAnggaran};
pub use user::{User, UserSummary};
