use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
use wad64::wad::{Wad,Lump};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// a small expanded archive with one compressible lump
fn sample_wad() -> Vec<u8> {
    let mut level = Vec::new();
    let mut i: usize = 0;
    while level.len() < 3000 {
        level.extend(format!("linedef {} goes to vertex {}; ",i,(i*7)%100).bytes());
        i += 1;
    }
    let wad = Wad {
        magic: *b"IWAD",
        lumps: vec![
            Lump::new("MAP01",Vec::new()),
            Lump::new("THINGS",b"too short to pack".to_vec()),
            Lump::new("SECTORS",level)
        ]
    };
    wad.build(1)
}

fn roundtrip_test(method: &str) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let original = temp_dir.path().join("expanded.wad");
    let packed = temp_dir.path().join("packed.wad");
    let restored = temp_dir.path().join("restored.wad");
    std::fs::write(&original,sample_wad())?;
    let mut cmd = Command::cargo_bin("wad64")?;
    cmd.arg("compress")
        .arg("-m").arg(method)
        .arg("-i").arg(&original)
        .arg("-o").arg(&packed)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("wad64")?;
    cmd.arg("decompress")
        .arg("-m").arg(method)
        .arg("-i").arg(&packed)
        .arg("-o").arg(&restored)
        .assert()
        .success();
    assert!(std::fs::read(&packed)?.len() < std::fs::read(&original)?.len());
    assert_eq!(std::fs::read(&restored)?,std::fs::read(&original)?);
    Ok(())
}

#[test]
fn compress_then_expand() -> STDRESULT {
    roundtrip_test("d64")
}

#[test]
fn compress_then_expand_legacy() -> STDRESULT {
    roundtrip_test("jaguar")
}

#[test]
fn pad_output_is_aligned() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let original = temp_dir.path().join("expanded.wad");
    let padded = temp_dir.path().join("padded.wad");
    std::fs::write(&original,sample_wad())?;
    let mut cmd = Command::cargo_bin("wad64")?;
    cmd.arg("pad")
        .arg("-i").arg(&original)
        .arg("-o").arg(&padded)
        .assert()
        .success();
    let dat = std::fs::read(&padded)?;
    let dir_off = u32::from_le_bytes([dat[8],dat[9],dat[10],dat[11]]) as usize;
    assert_eq!(dir_off % 4,0);
    for i in 0..3 {
        let entry = dir_off + i*16;
        let pos = u32::from_le_bytes([dat[entry],dat[entry+1],dat[entry+2],dat[entry+3]]);
        assert_eq!(pos % 4,0);
    }
    Ok(())
}

#[test]
fn list_names_lumps() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let original = temp_dir.path().join("expanded.wad");
    std::fs::write(&original,sample_wad())?;
    let mut cmd = Command::cargo_bin("wad64")?;
    cmd.arg("list")
        .arg("-i").arg(&original)
        .assert()
        .success()
        .stdout(predicate::str::contains("SECTORS"));
    Ok(())
}

#[test]
fn rejects_foreign_files() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let original = temp_dir.path().join("not_a_wad.bin");
    let out = temp_dir.path().join("out.wad");
    std::fs::write(&original,b"ZIP!not an archive at all")?;
    let mut cmd = Command::cargo_bin("wad64")?;
    cmd.arg("decompress")
        .arg("-i").arg(&original)
        .arg("-o").arg(&out)
        .assert()
        .failure();
    Ok(())
}
