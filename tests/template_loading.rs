mod common;

use common::{ex_mark, noise, stripes, write_png};
use std::path::PathBuf;
use symmatch::{
    collect_template_paths, load_templates, MatchScanner, ScanConfig, SymMatchError,
    TemplateSet, DEFAULT_MAX_TEMPLATES,
};

#[test]
fn loads_templates_in_order_with_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..DEFAULT_MAX_TEMPLATES)
        .map(|i| {
            let path = dir.path().join(format!("symbol_{i}.png"));
            write_png(&path, 16, 12, noise(16, 12, i as u64));
            path
        })
        .collect();

    let set = load_templates(&paths, DEFAULT_MAX_TEMPLATES).unwrap();
    assert_eq!(set.len(), DEFAULT_MAX_TEMPLATES);
    for (i, tpl) in set.iter().enumerate() {
        assert_eq!(tpl.name(), format!("symbol_{i}.png"));
        assert_eq!((tpl.width(), tpl.height()), (16, 12));
    }
}

#[test]
fn too_many_templates_fails_before_reading() {
    let paths: Vec<PathBuf> = (0..10)
        .map(|i| PathBuf::from(format!("/nonexistent/symbol_{i}.png")))
        .collect();

    let err = load_templates(&paths, DEFAULT_MAX_TEMPLATES).unwrap_err();
    assert_eq!(err, SymMatchError::TooManyTemplates { count: 10, max: 9 });
}

#[test]
fn unreadable_template_names_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    write_png(&good, 24, 40, ex_mark(24, 40));
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"definitely not a png").unwrap();
    let missing = dir.path().join("missing.png");

    for broken in [&bad, &missing] {
        let err = load_templates(&[good.clone(), broken.clone()], DEFAULT_MAX_TEMPLATES)
            .unwrap_err();
        match err {
            SymMatchError::TemplateLoad { path, .. } => assert_eq!(&path, broken),
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn uniform_template_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let white = dir.path().join("white.png");
    write_png(&white, 8, 8, vec![255u8; 64]);
    let glyph = dir.path().join("glyph.png");
    write_png(&glyph, 24, 40, ex_mark(24, 40));

    let set = load_templates(&[&white, &glyph], DEFAULT_MAX_TEMPLATES).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.get(0).unwrap().name(), "white.png");
    assert!(set.get(0).unwrap().plan().is_flat());
    assert!(!set.get(1).unwrap().plan().is_flat());
}

#[test]
fn template_folder_is_listed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("b.png"), 8, 8, stripes(8, 8));
    write_png(&dir.path().join("a.PNG"), 8, 8, stripes(8, 8));
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    std::fs::create_dir(dir.path().join("nested.png")).unwrap();

    let paths = collect_template_paths(dir.path()).unwrap();
    let names: Vec<_> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.PNG", "b.png"]);

    let set = load_templates(&paths, DEFAULT_MAX_TEMPLATES).unwrap();
    assert_eq!(set.get(0).unwrap().name(), "a.PNG");
}

#[test]
fn scanner_rejects_empty_set_and_bad_threshold() {
    let empty = TemplateSet::new(Vec::new(), DEFAULT_MAX_TEMPLATES).unwrap();
    let err = MatchScanner::new(empty, ScanConfig::default()).err().unwrap();
    assert_eq!(err, SymMatchError::NoTemplates);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glyph.png");
    write_png(&path, 24, 40, ex_mark(24, 40));
    let set = load_templates(&[&path], DEFAULT_MAX_TEMPLATES).unwrap();
    for threshold in [-0.1f32, 1.5] {
        let config = ScanConfig {
            threshold,
            ..ScanConfig::default()
        };
        let err = MatchScanner::new(set.clone(), config).err().unwrap();
        assert_eq!(err, SymMatchError::InvalidThreshold(threshold));
    }
}
