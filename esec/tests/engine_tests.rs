use esec::{
    Esec, EsecConfig, EsecError, Format, Keypair, MapEnv, decrypt_with_key, encrypt_document,
    generate_keypair,
};
use esec_crypto::{CryptoError, Envelope, PrivateKey};
use esec_format::FormatError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn keys() -> (Keypair, PrivateKey) {
    let pair = generate_keypair().unwrap();
    let private = PrivateKey::from_bytes(*pair.private_bytes());
    (pair, private)
}

fn as_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap()
}

async fn encrypt(doc: &str, format: Format) -> String {
    as_text(encrypt_document(doc.as_bytes(), format).await.unwrap())
}

async fn decrypt(doc: &str, format: Format, key: &PrivateKey) -> String {
    as_text(decrypt_with_key(doc.as_bytes(), format, key).await.unwrap())
}

// ── Round trips ─────────────────────────────────────────────────

#[tokio::test]
async fn json_scenario_round_trips() {
    let (pair, private) = keys();
    let doc = format!(
        r#"{{"_ESEC_PUBLIC_KEY": "{}", "DATABASE_URL": "postgres://localhost/mydb"}}"#,
        pair.public_hex()
    );

    let encrypted = encrypt(&doc, Format::Ejson).await;
    let parsed: serde_json::Value = serde_json::from_str(&encrypted).unwrap();
    assert_eq!(parsed["_ESEC_PUBLIC_KEY"], pair.public_hex());
    assert!(parsed["DATABASE_URL"].as_str().unwrap().starts_with("ESEC[1:"));

    assert_eq!(decrypt(&encrypted, Format::Ejson, &private).await, doc);
}

#[tokio::test]
async fn dotenv_round_trips_exactly() {
    let (pair, private) = keys();
    let doc = format!(
        "# app\nESEC_PUBLIC_KEY={}\nSECRET=hunter2\n_PLAIN=visible\n",
        pair.public_hex()
    );
    let encrypted = encrypt(&doc, Format::Dotenv).await;
    assert!(encrypted.contains("SECRET=ESEC[1:"));
    assert!(encrypted.contains("_PLAIN=visible\n"));
    assert_eq!(decrypt(&encrypted, Format::Dotenv, &private).await, doc);
}

#[tokio::test]
async fn yaml_round_trips_to_quoted_values() {
    let (pair, private) = keys();
    let doc = format!(
        "_ESEC_PUBLIC_KEY: {}\n# db\ndb:\n  password: s3cret\n  port: 5432\n",
        pair.public_hex()
    );
    let encrypted = encrypt(&doc, Format::Eyaml).await;
    assert!(encrypted.contains("  password: \"ESEC[1:"));
    assert!(encrypted.contains("  port: 5432\n"));

    let expected = doc.replace("password: s3cret", "password: \"s3cret\"");
    assert_eq!(decrypt(&encrypted, Format::Eyaml, &private).await, expected);
}

#[tokio::test]
async fn yaml_pem_block_round_trips() {
    let (pair, private) = keys();
    let doc = format!(
        "_ESEC_PUBLIC_KEY: {}\n\
         tls:\n\
         \x20 cert: |-\n\
         \x20   -----BEGIN CERTIFICATE-----\n\
         \x20   MIIB\n\
         \x20   -----END CERTIFICATE-----\n\
         \x20 port: 443\n",
        pair.public_hex()
    );

    let encrypted = encrypt(&doc, Format::Eyaml).await;
    assert!(encrypted.contains("  cert: \"ESEC[1:"), "{encrypted}");
    assert!(!encrypted.contains("MIIB"), "{encrypted}");
    assert!(encrypted.contains("\n  port: 443\n"), "{encrypted}");

    let expected = format!(
        "_ESEC_PUBLIC_KEY: {}\n\
         tls:\n\
         \x20 cert: \"-----BEGIN CERTIFICATE-----\\nMIIB\\n-----END CERTIFICATE-----\"\n\
         \x20 port: 443\n",
        pair.public_hex()
    );
    assert_eq!(decrypt(&encrypted, Format::Eyaml, &private).await, expected);
}

#[tokio::test]
async fn toml_round_trips_exactly() {
    let (pair, private) = keys();
    let doc = format!(
        "_ESEC_PUBLIC_KEY = \"{}\"\n\n[db]\npassword = \"s3cret\" # rotate\nport = 5432\n",
        pair.public_hex()
    );
    let encrypted = encrypt(&doc, Format::Etoml).await;
    assert!(encrypted.contains("password = \"ESEC[1:"));
    assert!(encrypted.contains("\" # rotate\nport = 5432\n"));
    assert_eq!(decrypt(&encrypted, Format::Etoml, &private).await, doc);
}

// ── Invariants ──────────────────────────────────────────────────

#[tokio::test]
async fn encrypting_twice_changes_nothing() {
    let (pair, _) = keys();
    for (format, doc) in [
        (Format::Ejson, format!("{{\"ESEC_PUBLIC_KEY\": \"{}\", \"a\": \"b\"}}", pair.public_hex())),
        (Format::Dotenv, format!("ESEC_PUBLIC_KEY={}\nA=b\n", pair.public_hex())),
        (Format::Eyaml, format!("ESEC_PUBLIC_KEY: {}\na: b\n", pair.public_hex())),
        (Format::Etoml, format!("ESEC_PUBLIC_KEY = \"{}\"\na = \"b\"\n", pair.public_hex())),
    ] {
        let once = encrypt(&doc, format).await;
        let twice = encrypt(&once, format).await;
        assert_eq!(twice, once, "{format}");
    }
}

#[tokio::test]
async fn underscored_values_are_byte_identical() {
    let (pair, _) = keys();
    let hex = pair.public_hex();
    for (format, doc, kept) in [
        (Format::Ejson, format!("{{\"_ESEC_PUBLIC_KEY\": \"{hex}\", \"_note\": \"keep me\"}}"), "\"_note\": \"keep me\""),
        (Format::Dotenv, format!("_ESEC_PUBLIC_KEY={hex}\n_NOTE=keep me\n"), "_NOTE=keep me\n"),
        (Format::Eyaml, format!("_ESEC_PUBLIC_KEY: {hex}\n_note: keep me\n"), "_note: keep me\n"),
        (Format::Etoml, format!("_ESEC_PUBLIC_KEY = \"{hex}\"\n_note = 'keep me'\n"), "_note = 'keep me'\n"),
    ] {
        let out = encrypt(&doc, format).await;
        assert!(out.contains(kept), "{format}: {out}");
        assert!(out.contains(&hex), "{format}: {out}");
    }
}

#[tokio::test]
async fn tampered_ciphertext_fails_to_decrypt() {
    let (pair, private) = keys();
    let doc = format!("ESEC_PUBLIC_KEY={}\nSECRET=value\n", pair.public_hex());
    let encrypted = encrypt(&doc, Format::Dotenv).await;

    let start = encrypted.find("ESEC[").unwrap();
    let end = start + encrypted[start..].find(']').unwrap() + 1;
    let mut envelope = Envelope::decode(encrypted[start..end].as_bytes()).unwrap();
    envelope.ciphertext[0] ^= 0x01;
    let tampered = format!("{}{}{}", &encrypted[..start], envelope.encode(), &encrypted[end..]);

    let err = decrypt_with_key(tampered.as_bytes(), Format::Dotenv, &private)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EsecError::Format(FormatError::Transform(CryptoError::DecryptionFailed))
    ));
}

#[tokio::test]
async fn wrong_key_fails_to_decrypt() {
    let (pair, _) = keys();
    let (_, other) = keys();
    let doc = format!("{{\"ESEC_PUBLIC_KEY\": \"{}\", \"a\": \"b\"}}", pair.public_hex());
    let encrypted = encrypt(&doc, Format::Ejson).await;

    let err = decrypt_with_key(encrypted.as_bytes(), Format::Ejson, &other)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EsecError::Format(FormatError::Transform(CryptoError::DecryptionFailed))
    ));
}

#[tokio::test]
async fn missing_public_key_is_reported() {
    let err = encrypt_document(b"{\"a\": \"b\"}", Format::Ejson)
        .await
        .unwrap_err();
    assert!(matches!(err, EsecError::Format(FormatError::PublicKeyMissing)));
}

// ── Files and key resolution ────────────────────────────────────

struct Workspace {
    dir: TempDir,
    pair: Keypair,
}

impl Workspace {
    fn new(keyring: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let pair = generate_keypair().unwrap();
        if let Some(env) = keyring {
            let key = PrivateKey::from_bytes(*pair.private_bytes());
            let line = esec::keyring_line(env, &key);
            std::fs::write(dir.path().join(".esec-keyring"), format!("{}\n", line.as_str())).unwrap();
        }
        Self { dir, pair }
    }

    fn esec(&self, env: MapEnv) -> Esec<MapEnv> {
        let config = EsecConfig {
            key_dir: self.dir.path().to_path_buf(),
            ..EsecConfig::default()
        };
        Esec::with_env(config, env)
    }

    fn write(&self, name: &str, contents: &str) -> std::path::PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

#[tokio::test]
async fn encrypt_in_place_then_decrypt_from_keyring() {
    let ws = Workspace::new(Some("qa"));
    let doc = format!("{{\"_ESEC_PUBLIC_KEY\": \"{}\", \"token\": \"abc\"}}\n", ws.pair.public_hex());
    let path = ws.write(".ejson.qa", &doc);
    let esec = ws.esec(MapEnv::new());

    assert!(esec.encrypt_file_in_place(&path).await.unwrap());
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("\"token\": \"ESEC[1:"));

    assert!(!esec.encrypt_file_in_place(&path).await.unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);

    let plain = esec.decrypt_file(&path, None).await.unwrap();
    assert_eq!(as_text(plain), doc);
}

#[tokio::test]
async fn failed_encrypt_leaves_file_untouched() {
    let ws = Workspace::new(None);
    let path = ws.write(".eyaml", "a: b\n");
    let err = ws.esec(MapEnv::new()).encrypt_file_in_place(&path).await.unwrap_err();
    assert!(matches!(err, EsecError::Format(FormatError::PublicKeyMissing)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: b\n");
    assert_eq!(std::fs::read_dir(ws.dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn environment_variable_key_beats_keyring() {
    let ws = Workspace::new(None);
    let doc = format!("ESEC_PUBLIC_KEY={}\nA=b\n", ws.pair.public_hex());
    let path = ws.write(".env.prod", &doc);
    let env = MapEnv::new().with("ESEC_PRIVATE_KEY_PROD", ws.pair.private_hex().as_str());
    let esec = ws.esec(env);

    esec.encrypt_file_in_place(&path).await.unwrap();
    let plain = esec.decrypt_file(&path, None).await.unwrap();
    assert_eq!(as_text(plain), doc);
}

#[tokio::test]
async fn user_key_decrypts_without_keyring() {
    let ws = Workspace::new(None);
    let doc = format!("ESEC_PUBLIC_KEY = \"{}\"\nA = \"b\"\n", ws.pair.public_hex());
    let path = ws.write("app.etoml", &doc);
    let esec = ws.esec(MapEnv::new());

    esec.encrypt_file_in_place(&path).await.unwrap();
    let key = ws.pair.private_hex();
    let plain = esec.decrypt_file(&path, Some(key.as_str())).await.unwrap();
    assert_eq!(as_text(plain), doc);
}

#[tokio::test]
async fn missing_keyring_is_reported() {
    let ws = Workspace::new(None);
    let doc = format!("ESEC_PUBLIC_KEY={}\nA=b\n", ws.pair.public_hex());
    let path = ws.write(".env", &doc);
    let err = ws.esec(MapEnv::new()).decrypt_file(&path, None).await.unwrap_err();
    assert!(matches!(
        err,
        EsecError::Keyring(esec_keyring::KeyringError::KeyringFileMissing { ref name, .. })
            if name == "ESEC_PRIVATE_KEY"
    ));
}

#[test]
fn detects_environment_from_variables_then_keyring() {
    let ws = Workspace::new(Some("qa"));
    let env = MapEnv::new().with("ESEC_PRIVATE_KEY_PROD", "00");
    assert_eq!(ws.esec(env).detect_environment().unwrap(), "prod");
    assert_eq!(ws.esec(MapEnv::new()).detect_environment().unwrap(), "qa");

    let empty = Workspace::new(None);
    assert_eq!(empty.esec(MapEnv::new()).detect_environment().unwrap(), "");
}

#[test]
fn key_dir_override_from_environment() {
    let env = MapEnv::new().with("ESEC_KEY_DIR", "/etc/esec");
    let esec = Esec::with_env(EsecConfig::default(), env);
    assert_eq!(esec.config().key_dir, std::path::PathBuf::from("/etc/esec"));
    assert_eq!(
        esec.path_for_environment(std::path::Path::new("conf"), "prod").unwrap(),
        std::path::PathBuf::from("conf/.ejson.prod")
    );
}
