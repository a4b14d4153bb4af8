mod common;

use std::process::Command;
use std::sync::OnceLock;

use anyhow::{ensure, Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

// These tests run against a live database. Without DATABASE_URL (in the
// environment or .env) they return early.

const PASSWORD: &str = "rahasia123";
const TAHUN: i32 = 2024;

fn database_configured() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").map_or(false, |url| !url.trim().is_empty())
}

fn evkin(args: &[&str]) -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_evkin"))
        .args(args)
        .output()
        .context("failed to run evkin CLI")?;
    ensure!(
        output.status.success(),
        "evkin {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

fn migrate_once() -> Result<()> {
    static MIGRATED: OnceLock<Result<(), String>> = OnceLock::new();
    MIGRATED
        .get_or_init(|| evkin(&["migrate"]).map_err(|e| e.to_string()))
        .clone()
        .map_err(anyhow::Error::msg)
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

struct Session {
    id: String,
    token: String,
}

struct Api {
    client: Client,
    base_url: String,
}

impl Api {
    async fn call(&self, method: Method, path: &str, token: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// Call and require the given status; returns `data`.
    async fn expect(&self, method: Method, path: &str, token: &str, body: Option<Value>, want: StatusCode) -> Result<Value> {
        let (status, body) = self.call(method.clone(), path, token, body).await?;
        ensure!(status == want, "{} {} answered {} (wanted {}): {}", method, path, status, want, body);
        Ok(body["data"].clone())
    }

    async fn login(&self, username: &str) -> Result<Session> {
        let res = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await?;
        ensure!(res.status() == StatusCode::OK, "login for {} answered {}", username, res.status());
        let body = res.json::<Value>().await?;
        Ok(Session {
            id: body["data"]["user"]["id"].as_str().context("login without user id")?.to_string(),
            token: body["data"]["token"].as_str().context("login without token")?.to_string(),
        })
    }

    async fn create_clinic(&self, admin: &Session) -> Result<Session> {
        let username = unique("pkm");
        self.expect(
            Method::POST,
            "/api/users",
            &admin.token,
            Some(json!({
                "username": username,
                "password": PASSWORD,
                "role": "puskesmas",
                "nama_puskesmas": format!("Puskesmas {}", username),
            })),
            StatusCode::CREATED,
        )
        .await?;
        self.login(&username).await
    }

    async fn status_of(&self, who: &Session, id: &str) -> Result<String> {
        let row = self
            .expect(Method::GET, &format!("/api/laporan/{}", id), &who.token, None, StatusCode::OK)
            .await?;
        Ok(row["status"].as_str().unwrap_or_default().to_string())
    }
}

struct Fixture {
    api: Api,
    admin: Session,
    clinic_a: Session,
    clinic_b: Session,
    sub_kegiatan: [String; 2],
    sumber_anggaran: String,
    satuan: String,
}

impl Fixture {
    fn row(&self, sub: usize, bulan: &str) -> Value {
        json!({
            "sub_kegiatan_id": self.sub_kegiatan[sub],
            "sumber_anggaran_id": self.sumber_anggaran,
            "satuan_id": self.satuan,
            "bulan": bulan,
            "tahun": TAHUN,
            "target_k": 100,
            "realisasi_k": 50,
            "angkas": 1000000,
            "target_rp": 2000000,
            "realisasi_rp": 500000,
        })
    }

    /// Create a row and return its id.
    async fn create(&self, who: &Session, sub: usize, bulan: &str) -> Result<String> {
        let row = self
            .api
            .expect(Method::POST, "/api/laporan", &who.token, Some(self.row(sub, bulan)), StatusCode::CREATED)
            .await?;
        Ok(row["id"].as_str().context("created row without id")?.to_string())
    }

    async fn submit(&self, who: &Session, bulan: &str) -> Result<(StatusCode, Value)> {
        self.api
            .call(
                Method::POST,
                "/api/laporan/submit",
                &who.token,
                Some(json!({ "bulan": bulan, "tahun": TAHUN })),
            )
            .await
    }
}

/// Fresh admin, two clinics and a small catalog, all uniquely named.
async fn fixture() -> Result<Option<Fixture>> {
    if !database_configured() {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return Ok(None);
    }
    migrate_once()?;

    let server = common::ensure_server().await?;
    let api = Api {
        client: Client::new(),
        base_url: server.base_url.clone(),
    };

    let admin_name = unique("adm");
    evkin(&[
        "user",
        "create",
        "--username",
        admin_name.as_str(),
        "--password",
        PASSWORD,
        "--role",
        "admin",
    ])?;
    let admin = api.login(&admin_name).await?;
    let clinic_a = api.create_clinic(&admin).await?;
    let clinic_b = api.create_clinic(&admin).await?;

    let token = admin.token.as_str();
    let satuan = api
        .expect(Method::POST, "/api/masterdata/satuan", token, Some(json!({ "nama": unique("Orang") })), StatusCode::CREATED)
        .await?;
    let sumber = api
        .expect(
            Method::POST,
            "/api/masterdata/sumber-anggaran",
            token,
            Some(json!({ "nama": unique("BOK") })),
            StatusCode::CREATED,
        )
        .await?;
    let kegiatan = api
        .expect(
            Method::POST,
            "/api/kegiatan",
            token,
            Some(json!({ "kode": unique("1.02"), "nama": "Pelayanan Kesehatan" })),
            StatusCode::CREATED,
        )
        .await?;
    let kegiatan_id = kegiatan["id"].as_str().context("kegiatan without id")?;

    let mut subs = Vec::new();
    for nama in ["Imunisasi", "Posyandu"] {
        let sub = api
            .expect(
                Method::POST,
                &format!("/api/kegiatan/{}/sub-kegiatan", kegiatan_id),
                token,
                Some(json!({ "kode": unique("1.02.2"), "nama": nama, "indikator": "Cakupan" })),
                StatusCode::CREATED,
            )
            .await?;
        let sub_id = sub["id"].as_str().context("sub kegiatan without id")?.to_string();
        api.expect(
            Method::POST,
            "/api/sub-kegiatan-sumber-dana",
            token,
            Some(json!({ "sub_kegiatan_id": sub_id, "sumber_anggaran_id": sumber["id"] })),
            StatusCode::CREATED,
        )
        .await?;
        subs.push(sub_id);
    }

    for clinic in [&clinic_a, &clinic_b] {
        api.expect(
            Method::POST,
            "/api/puskesmas-config",
            token,
            Some(json!({ "user_id": clinic.id, "sub_kegiatan_ids": subs })),
            StatusCode::CREATED,
        )
        .await?;
    }

    Ok(Some(Fixture {
        api,
        admin,
        clinic_a,
        clinic_b,
        sub_kegiatan: [subs[0].clone(), subs[1].clone()],
        sumber_anggaran: sumber["id"].as_str().context("sumber anggaran without id")?.to_string(),
        satuan: satuan["id"].as_str().context("satuan without id")?.to_string(),
    }))
}

#[tokio::test]
async fn created_row_reports_capaian() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };

    let mut body = fx.row(0, "Januari");
    body["target_rp"] = json!(0);
    body["realisasi_rp"] = json!(250000);
    let row = fx
        .api
        .expect(Method::POST, "/api/laporan", &fx.clinic_a.token, Some(body), StatusCode::CREATED)
        .await?;

    assert_eq!(row["status"], "tersimpan");
    assert_eq!(row["bulan"], "Januari");
    assert_eq!(row["capaian_k"], "50.00");
    assert_eq!(row["capaian_pagu"], "0.00");
    Ok(())
}

#[tokio::test]
async fn submit_moves_saved_rows_once() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };
    let a = &fx.clinic_a;

    let jan_0 = fx.create(a, 0, "Januari").await?;
    let jan_1 = fx.create(a, 1, "Januari").await?;
    let feb_0 = fx.create(a, 0, "Februari").await?;

    let (status, body) = fx.submit(a, "Januari").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["updated"], 2);
    assert_eq!(fx.api.status_of(a, &jan_0).await?, "terkirim");
    assert_eq!(fx.api.status_of(a, &jan_1).await?, "terkirim");
    assert_eq!(fx.api.status_of(a, &feb_0).await?, "tersimpan");

    // a second submit of the same month is refused and changes nothing
    let (status, body) = fx.submit(a, "Januari").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["success"], false);
    assert_eq!(fx.api.status_of(a, &jan_0).await?, "terkirim");
    assert_eq!(fx.api.status_of(a, &feb_0).await?, "tersimpan");

    // submitted rows are locked for the clinic
    let (status, _) = fx
        .api
        .call(Method::PUT, &format!("/api/laporan/{}", jan_0), &a.token, Some(json!({ "realisasi_k": 60 })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn submit_with_nothing_saved_reports_zero() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };

    let (status, body) = fx.submit(&fx.clinic_a, "Maret").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["updated"], 0);
    Ok(())
}

#[tokio::test]
async fn bulk_return_stays_inside_its_scope() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };
    let (a, b) = (&fx.clinic_a, &fx.clinic_b);

    let a_jan = fx.create(a, 0, "Januari").await?;
    let a_feb = fx.create(a, 0, "Februari").await?;
    let b_jan = fx.create(b, 0, "Januari").await?;
    for (who, bulan) in [(a, "Januari"), (a, "Februari"), (b, "Januari")] {
        let (status, body) = fx.submit(who, bulan).await?;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let returned = fx
        .api
        .expect(
            Method::POST,
            "/api/admin/return",
            &fx.admin.token,
            Some(json!({ "user_id": a.id, "bulan": "Januari", "tahun": TAHUN, "catatan": "Lengkapi data" })),
            StatusCode::OK,
        )
        .await?;
    assert_eq!(returned["updated"], 1);

    let row = fx
        .api
        .expect(Method::GET, &format!("/api/laporan/{}", a_jan), &a.token, None, StatusCode::OK)
        .await?;
    assert_eq!(row["status"], "tersimpan");
    assert_eq!(row["catatan"], "Lengkapi data");
    assert_eq!(fx.api.status_of(a, &a_feb).await?, "terkirim");
    assert_eq!(fx.api.status_of(b, &b_jan).await?, "terkirim");

    // nothing left to return in that scope
    let (status, _) = fx
        .api
        .call(
            Method::POST,
            "/api/admin/return",
            &fx.admin.token,
            Some(json!({ "user_id": a.id, "bulan": "Januari", "tahun": TAHUN })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn clinic_cannot_reach_another_clinics_row() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };
    let id = fx.create(&fx.clinic_a, 0, "April").await?;
    let path = format!("/api/laporan/{}", id);
    let other = &fx.clinic_b.token;

    let (status, _) = fx.api.call(Method::GET, &path, other, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = fx
        .api
        .call(Method::PUT, &path, other, Some(json!({ "realisasi_k": 1 })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = fx.api.call(Method::DELETE, &path, other, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // still there for its owner and the admin
    assert_eq!(fx.api.status_of(&fx.clinic_a, &id).await?, "tersimpan");
    assert_eq!(fx.api.status_of(&fx.admin, &id).await?, "tersimpan");
    Ok(())
}

#[tokio::test]
async fn body_errors_use_the_error_envelope() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };
    let token = &fx.clinic_a.token;

    let (status, body) = fx
        .api
        .call(Method::POST, "/api/laporan", token, Some(fx.row(0, "Smarch")))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");

    let mut too_big = fx.row(0, "Mei");
    too_big["target_rp"] = json!("10000000000000000");
    let (status, body) = fx.api.call(Method::POST, "/api/laporan", token, Some(too_big)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"].get("target_rp").is_some(), "{}", body);

    // lowercase names and month numbers are accepted like in query strings
    fx.api
        .expect(Method::POST, "/api/laporan", token, Some(fx.row(0, "juni")), StatusCode::CREATED)
        .await?;
    let mut by_number = fx.row(1, "Juni");
    by_number["bulan"] = json!(6);
    let row = fx
        .api
        .expect(Method::POST, "/api/laporan", token, Some(by_number), StatusCode::CREATED)
        .await?;
    assert_eq!(row["bulan"], "Juni");

    let (status, _) = fx
        .api
        .call(Method::GET, "/api/laporan?bulan=Smarch", token, None)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn clinic_token_cannot_reach_admin_routes() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };

    for uri in [
        "/api/admin/verifikasi",
        "/api/admin/dashboard",
        "/api/users",
        "/api/report/puskesmas",
        "/api/masterdata/satuan",
    ] {
        let (status, _) = fx.api.call(Method::GET, uri, &fx.clinic_a.token, None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        let (status, _) = fx.api.call(Method::GET, uri, &fx.admin.token, None).await?;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }

    let months = fx
        .api
        .expect(Method::GET, "/api/reference/bulan", &fx.clinic_a.token, None, StatusCode::OK)
        .await?;
    assert_eq!(months.as_array().map(Vec::len), Some(12));
    Ok(())
}

#[tokio::test]
async fn account_changes_apply_to_issued_tokens() -> Result<()> {
    let Some(fx) = fixture().await? else { return Ok(()) };
    let clinic = fx.api.create_clinic(&fx.admin).await?;
    let user_path = format!("/api/users/{}", clinic.id);

    // promotion takes effect without a new login
    let (status, _) = fx.api.call(Method::GET, "/api/admin/dashboard", &clinic.token, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    fx.api
        .expect(Method::PUT, &user_path, &fx.admin.token, Some(json!({ "role": "admin" })), StatusCode::OK)
        .await?;
    let (status, _) = fx.api.call(Method::GET, "/api/admin/dashboard", &clinic.token, None).await?;
    assert_eq!(status, StatusCode::OK);

    // deactivation locks the token out
    fx.api
        .expect(Method::PUT, &user_path, &fx.admin.token, Some(json!({ "is_active": false })), StatusCode::OK)
        .await?;
    let (status, body) = fx.api.call(Method::GET, "/api/laporan", &clinic.token, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    Ok(())
}
