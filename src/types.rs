/// Shared types used across the codebase
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role, stored as the `user_role` postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Puskesmas,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Puskesmas => "puskesmas",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "puskesmas" => Ok(Role::Puskesmas),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report status, stored as the `laporan_status` postgres enum.
///
/// `tersimpan` is the saved draft a clinic works on; `menunggu` only exists
/// on legacy rows and behaves like a draft except that submit ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "laporan_status", rename_all = "lowercase")]
pub enum LaporanStatus {
    Menunggu,
    Tersimpan,
    Terkirim,
    Diverifikasi,
    Ditolak,
}

impl LaporanStatus {
    pub const ALL: [LaporanStatus; 5] = [
        LaporanStatus::Menunggu,
        LaporanStatus::Tersimpan,
        LaporanStatus::Terkirim,
        LaporanStatus::Diverifikasi,
        LaporanStatus::Ditolak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LaporanStatus::Menunggu => "menunggu",
            LaporanStatus::Tersimpan => "tersimpan",
            LaporanStatus::Terkirim => "terkirim",
            LaporanStatus::Diverifikasi => "diverifikasi",
            LaporanStatus::Ditolak => "ditolak",
        }
    }

    /// Whether the owning clinic may still edit or delete the row.
    pub fn is_draft(&self) -> bool {
        matches!(
            self,
            LaporanStatus::Menunggu | LaporanStatus::Tersimpan | LaporanStatus::Ditolak
        )
    }

    /// Outcomes an admin may record when reviewing a submitted row.
    pub fn is_review_outcome(&self) -> bool {
        matches!(self, LaporanStatus::Diverifikasi | LaporanStatus::Ditolak)
    }
}

impl FromStr for LaporanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LaporanStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

impl fmt::Display for LaporanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting month, stored as the ordered `bulan` postgres enum so that
/// `ORDER BY bulan` follows the calendar.
///
/// Serializes as the Indonesian name. Deserializes from the name in any case
/// or the month number, the same forms the query string accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, sqlx::Type)]
#[sqlx(type_name = "bulan")]
pub enum Bulan {
    Januari,
    Februari,
    Maret,
    April,
    Mei,
    Juni,
    Juli,
    Agustus,
    September,
    Oktober,
    November,
    Desember,
}

impl Bulan {
    pub const ALL: [Bulan; 12] = [
        Bulan::Januari,
        Bulan::Februari,
        Bulan::Maret,
        Bulan::April,
        Bulan::Mei,
        Bulan::Juni,
        Bulan::Juli,
        Bulan::Agustus,
        Bulan::September,
        Bulan::Oktober,
        Bulan::November,
        Bulan::Desember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bulan::Januari => "Januari",
            Bulan::Februari => "Februari",
            Bulan::Maret => "Maret",
            Bulan::April => "April",
            Bulan::Mei => "Mei",
            Bulan::Juni => "Juni",
            Bulan::Juli => "Juli",
            Bulan::Agustus => "Agustus",
            Bulan::September => "September",
            Bulan::Oktober => "Oktober",
            Bulan::November => "November",
            Bulan::Desember => "Desember",
        }
    }

    /// 1-based calendar month.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn from_number(n: u32) -> Option<Bulan> {
        Bulan::ALL.get(n.checked_sub(1)? as usize).copied()
    }
}

impl FromStr for Bulan {
    type Err = String;

    /// Accepts the Indonesian name in any case, or the month number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Bulan::from_number(n).ok_or_else(|| format!("invalid month number {}", n));
        }
        Bulan::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown month '{}'", s))
    }
}

impl<'de> Deserialize<'de> for Bulan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BulanVisitor;

        impl<'de> Visitor<'de> for BulanVisitor {
            type Value = Bulan;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a month name or a month number 1-12")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Bulan, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Bulan, E> {
                u32::try_from(v)
                    .ok()
                    .and_then(Bulan::from_number)
                    .ok_or_else(|| E::custom(format!("invalid month number {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Bulan, E> {
                match u64::try_from(v) {
                    Ok(n) => self.visit_u64(n),
                    Err(_) => Err(E::custom(format!("invalid month number {}", v))),
                }
            }
        }

        deserializer.deserialize_any(BulanVisitor)
    }
}

impl fmt::Display for Bulan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
