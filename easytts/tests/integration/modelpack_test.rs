//! モデルパック取り込みの通しテスト

use easytts::modelpack::discovery::{discover_packs, PackOutcome, STATE_FILE};
use easytts::modelpack::layout::REQUIRED_MODEL_FILES;
use easytts::modelpack::manifest::{PromptSource, PROMPT_MANIFEST_FILE};
use easytts::modelpack::{import_pack, list_models, preset_text};
use std::fs;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;

fn write_pack(path: &Path, prefix: &str, extra: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for name in REQUIRED_MODEL_FILES {
        zip.start_file(format!("{prefix}{name}"), SimpleFileOptions::default()).unwrap();
        zip.write_all(b"onnx").unwrap();
    }
    for (name, content) in extra {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn nested_pack_with_emotion_dir_gets_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let zip_path = tmp.path().join("Mika Pack.zip");
    write_pack(
        &zip_path,
        "CharacterModels/v2ProPlus/tts_models/",
        &[
            ("emotion/开心.wav", "RIFF"),
            ("emotion/开心.txt", "今天真开心"),
            ("emotion/普通.ogg", "OggS"),
            ("emotion/普通.txt", "你好"),
        ],
    );

    let root = tmp.path().join("models");
    let model = import_pack(&zip_path, &root, None, Some("zh")).unwrap();

    assert_eq!(model.name, "Mika_Pack");
    assert!(model.complete);
    assert_eq!(
        model.onnx_dir,
        root.join("Mika_Pack/CharacterModels/v2ProPlus/tts_models")
    );
    let prompts = model.prompts.as_ref().unwrap();
    assert_eq!(prompts.source, PromptSource::EmotionDir);
    assert!(root.join("Mika_Pack").join(PROMPT_MANIFEST_FILE).is_file());

    let (choices, default) = model.preset_choices();
    assert_eq!(default, "普通");
    assert_eq!(choices.len(), 2);
    assert_eq!(preset_text(Some(&prompts.entries), "开心"), "今天真开心");

    // 生成済みマニフェストは次回そのまま使われる
    let reopened = list_models(&root);
    assert_eq!(reopened.len(), 1);
    let reopened_prompts = reopened[0].prompts.as_ref().unwrap();
    assert_eq!(reopened_prompts.source, PromptSource::Bundled);
    assert_eq!(reopened_prompts.dir, root.join("Mika_Pack/emotion"));
    assert_eq!(reopened_prompts.entries, prompts.entries);
}

#[test]
fn discovery_imports_changed_packs_only() {
    let tmp = tempfile::tempdir().unwrap();
    let packs = tmp.path().join("ModelPacks");
    let root = tmp.path().join("models");
    fs::create_dir_all(&packs).unwrap();
    write_pack(&packs.join("alpha.zip"), "", &[]);
    write_pack(
        &packs.join("beta.zip"),
        "tts_models/",
        &[("easytts_pack.json", "\u{feff}{\"model_name\": \"Beta Voice\", \"language\": \"en\"}")],
    );

    let first = discover_packs(&[packs.clone()], &root).unwrap();
    assert!(first.state_written);
    assert!(root.join(STATE_FILE).is_file());
    let names: Vec<&str> = first.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Beta_Voice", "alpha"]);
    assert_eq!(first.models[0].language, "en");

    let second = discover_packs(&[packs.clone()], &root).unwrap();
    assert!(!second.state_written);
    assert!(second
        .packs
        .iter()
        .all(|p| matches!(p.outcome, PackOutcome::Unchanged { .. })));

    // サイズが変われば再展開
    write_pack(&packs.join("alpha.zip"), "", &[("README.txt", "v2")]);
    let third = discover_packs(&[packs], &root).unwrap();
    assert!(third.state_written);
    assert!(matches!(
        &third.packs[0].outcome,
        PackOutcome::Imported { model_name } if model_name == "alpha"
    ));
    assert!(root.join("alpha").join("README.txt").is_file());
}
