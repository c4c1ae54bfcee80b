mod support;

use esec_format::{FormatError, FormatHandler, TomlHandler};
use pretty_assertions::assert_eq;
use support::{PUBLIC_HEX, fail_on, run, unwrap_value, wrap};

fn document() -> String {
    format!(
        r#"_ESEC_PUBLIC_KEY = "{PUBLIC_HEX}"
# top level
title = 'literal'
port = 8080
started = 1979-05-27T07:32:00Z

[database]
url = "postgres://localhost/mydb" # inline comment
hosts = ["a", 'b']
_skip = "keep"
creds = {{ user = "admin", _note = "n" }}

[[servers]]
name = "alpha"
"#
    )
}

#[tokio::test]
async fn transforms_strings_and_keeps_layout() {
    let out = run(&TomlHandler, &document(), wrap()).await.unwrap();
    let expected = format!(
        r#"_ESEC_PUBLIC_KEY = "{PUBLIC_HEX}"
# top level
title = "ENC(literal)"
port = 8080
started = 1979-05-27T07:32:00Z

[database]
url = "ENC(postgres://localhost/mydb)" # inline comment
hosts = ["ENC(a)", "ENC(b)"]
_skip = "keep"
creds = {{ user = "ENC(admin)", _note = "n" }}

[[servers]]
name = "ENC(alpha)"
"#
    );
    assert_eq!(out, expected);
}

#[tokio::test]
async fn inverse_transform_restores_basic_strings() {
    let doc = "a = \"x\"\n[t]\nb = \"y\"\n";
    let wrapped = run(&TomlHandler, doc, wrap()).await.unwrap();
    let restored = run(&TomlHandler, &wrapped, unwrap_value()).await.unwrap();
    assert_eq!(restored, doc);
}

#[tokio::test]
async fn arrays_under_skipped_keys_are_transformed() {
    let out = run(&TomlHandler, "_list = [\"a\"]\n", wrap()).await.unwrap();
    assert_eq!(out, "_list = [\"ENC(a)\"]\n");
}

#[tokio::test]
async fn dotted_keys() {
    let out = run(&TomlHandler, "site.name = \"x\"\n", wrap()).await.unwrap();
    assert_eq!(out, "site.name = \"ENC(x)\"\n");
}

#[tokio::test]
async fn multiline_string_becomes_escaped_basic_string() {
    let doc = "text = \"\"\"\nline1\nline2\"\"\"\n";
    let out = run(&TomlHandler, doc, wrap()).await.unwrap();
    assert_eq!(out, "text = \"ENC(line1\\nline2)\"\n");
}

#[tokio::test]
async fn multibyte_keys_and_values() {
    let doc = "\"名前\" = \"値\"\nnext = \"é\"\n";
    let out = run(&TomlHandler, doc, wrap()).await.unwrap();
    assert_eq!(out, "\"名前\" = \"ENC(値)\"\nnext = \"ENC(é)\"\n");
}

#[tokio::test]
async fn invalid_toml_is_a_parse_error() {
    let err = run(&TomlHandler, "a = \n", wrap()).await.unwrap_err();
    assert!(matches!(err, FormatError::Parse { format: "TOML", .. }));
}

#[tokio::test]
async fn transform_failure_aborts_document() {
    let err = run(&TomlHandler, "a = \"poison\"\n", fail_on("poison"))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::Transform(_)));
}

#[test]
fn extracts_public_key() {
    let key = TomlHandler.extract_public_key(document().as_bytes()).unwrap();
    assert_eq!(hex::encode(key), PUBLIC_HEX);
}

#[test]
fn public_key_inside_table_is_not_found() {
    let doc = format!("[t]\nESEC_PUBLIC_KEY = \"{PUBLIC_HEX}\"\n");
    let err = TomlHandler.extract_public_key(doc.as_bytes()).unwrap_err();
    assert!(matches!(err, FormatError::PublicKeyMissing));
}

#[test]
fn integer_public_key_is_invalid() {
    let err = TomlHandler
        .extract_public_key(b"ESEC_PUBLIC_KEY = 1\n")
        .unwrap_err();
    assert!(matches!(err, FormatError::PublicKeyInvalid(_)));
}
