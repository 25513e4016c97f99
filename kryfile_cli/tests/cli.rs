use assert_cmd::prelude::*;
use indoc::indoc;
use std::process::Command;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes192;
use sha2::{Digest, Sha512};

const SECRET: &str = "58691958710496814910943867304986071324198643072";
const PLAINTEXT: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua.";

fn build_patch_container(plaintext: &[u8]) -> Vec<u8> {
    let subkey = [0xDE, 0xAD, 0xBE, 0xEF, 0x10, 0x32, 0x54, 0x76];

    let mut hasher = Sha512::new();
    hasher.update(subkey);
    hasher.update(SECRET.as_bytes());
    let digest = hasher.finalize();
    let cipher = Aes192::new(GenericArray::from_slice(&digest[..24]));

    let mut out = Vec::new();
    out.extend_from_slice(b"8O");
    out.extend_from_slice(&(plaintext.len() as u32).to_le_bytes());
    out.extend_from_slice(&(subkey.len() as u32).to_le_bytes());
    out.extend_from_slice(&subkey);

    let mut verify = [0u8; 16];
    verify[..2].copy_from_slice(b":D");
    let mut verify = aes::Block::from(verify);
    cipher.encrypt_block(&mut verify);
    out.extend_from_slice(&verify);

    let mut padded = plaintext.to_vec();
    padded.resize(plaintext.len().div_ceil(16) * 16, 0);
    let mut backbuffer = [0u8; 16];
    for (i, chunk) in padded.chunks_exact(16).enumerate() {
        let mut block = [0u8; 16];
        for j in 0..16 {
            block[j] = chunk[j] ^ backbuffer[j].wrapping_sub(j as u8);
        }
        let mut block = aes::Block::from(block);
        cipher.encrypt_block(&mut block);
        if (i as u64 * 16 + 16) % 4080 == 0 {
            backbuffer = [0; 16];
        } else {
            backbuffer.copy_from_slice(&block);
        }
        out.extend_from_slice(&block);
    }
    out
}

fn fixture(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("update.patch");
    std::fs::write(&path, build_patch_container(PLAINTEXT)).unwrap();
    path
}

#[test]
fn test_cli_info() {
    let dir = tempfile::tempdir().unwrap();
    let assert = Command::cargo_bin("kry")
        .unwrap()
        .arg("info")
        .arg(fixture(&dir))
        .assert();
    assert.success().stdout(indoc! {"
        kind: Patch
        plaintext length: 123
        subkey length: 8
    "});
}

#[test]
fn test_cli_get() {
    let dir = tempfile::tempdir().unwrap();
    let assert = Command::cargo_bin("kry")
        .unwrap()
        .arg("get")
        .arg(fixture(&dir))
        .arg("--secret")
        .arg(SECRET)
        .assert();
    assert.success().stdout(PLAINTEXT);
}

#[test]
fn test_cli_get_wrong_secret() {
    let dir = tempfile::tempdir().unwrap();
    let assert = Command::cargo_bin("kry")
        .unwrap()
        .arg("get")
        .arg(fixture(&dir))
        .arg("--secret")
        .arg("65487573252940086457044055343188392138734144585")
        .assert();
    assert.failure().stderr("Error: KeyVerifyFailed\n");
}

#[test]
fn test_cli_get_without_keys() {
    let dir = tempfile::tempdir().unwrap();
    let assert = Command::cargo_bin("kry")
        .unwrap()
        .arg("get")
        .arg(fixture(&dir))
        .assert();
    assert.failure().stderr("Error: MissingKey\n");
}

#[test]
fn test_cli_decrypt() {
    let dir = tempfile::tempdir().unwrap();
    let input = fixture(&dir);
    let out_dir = dir.path().join("out");

    let assert = Command::cargo_bin("kry")
        .unwrap()
        .arg("decrypt")
        .arg(&input)
        .arg("-o")
        .arg(&out_dir)
        .arg("--secret")
        .arg(SECRET)
        .assert();
    assert.success().stdout(indoc! {"
        Decrypted 1 files
    "});

    assert_eq!(std::fs::read(out_dir.join("update")).unwrap(), PLAINTEXT);
}
