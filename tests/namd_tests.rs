use alchem_rs::{
    extract_u_nk, extract_u_nk_with, read_u_nk, FepError, NamdOptions, OpenWindowPolicy, UNk,
};
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

const HEADER: &str = "#            STEP                 Elec                     vdW                    dE           dE_avg         Temperature             dG\n#                           l             l+dl      l             l+dl         E(l+dl)-E(l)\n";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test helper to create a temporary `.fepout` file
fn create_test_fepout(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("alchemy.fepout");
    let mut file = File::create(&file_path).unwrap();
    write!(file, "{}", content).unwrap();
    (dir, file_path)
}

fn fep_window(l1: &str, l2: &str, frames: &[(u64, f64)]) -> String {
    let mut text = format!(
        "#NEW FEP WINDOW: LAMBDA SET TO {} LAMBDA2 {}\n#FEP EQUILIBRATION PHASE\n",
        l1, l2
    );
    text.push_str(
        "FepEnergy:         0     -1.2345     -1.2300      0.5000      0.5100      9.9999      9.9999    300.0000      0.0000\n",
    );
    text.push_str("#STARTING COLLECTION OF ENSEMBLE AVERAGE\n");
    for &(step, de) in frames {
        text.push_str(&format!(
            "FepEnergy: {:>9} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4}\n",
            step, -1.2345, -1.2300, 0.5, 0.51, de, de, 300.0, de
        ));
    }
    text.push_str(&format!(
        "#Free energy change for lambda window [ {} {} ] is 0.0042 ; net change until now is 0.0042\n",
        l1, l2
    ));
    text
}

fn forward_file() -> String {
    let mut text = String::from(HEADER);
    text.push_str(&fep_window("0.0", "0.5", &[(100, 0.25), (200, 0.5)]));
    text.push_str(&fep_window("0.5", "1.0", &[(300, 0.75), (400, 1.0)]));
    text
}

#[test]
fn test_extract_from_file() {
    init_logging();
    let (_dir, file_path) = create_test_fepout(&forward_file());

    let u_nk = extract_u_nk(&file_path).unwrap();

    assert_eq!(u_nk.states(), &["0.00", "0.50", "1.00"]);
    // Two windows of two frames each, plus the zero rows of the last evaluated state
    assert_eq!(u_nk.n_rows(), 6);
    assert_eq!(u_nk.get(100.0, "0.00", "0.50"), Some(0.25));
    assert_eq!(u_nk.get(400.0, "0.50", "1.00"), Some(1.0));
    assert_eq!(u_nk.get(400.0, "1.00", "1.00"), Some(0.0));
    assert_eq!(u_nk.samples_per_state().unwrap().to_vec(), vec![2, 2, 2]);
}

#[test]
fn test_file_and_reader_agree() {
    let content = forward_file();
    let (_dir, file_path) = create_test_fepout(&content);

    let from_file = extract_u_nk(&file_path).unwrap();
    let from_reader = read_u_nk(content.as_bytes(), &NamdOptions::default()).unwrap();
    assert_eq!(from_file, from_reader);
}

#[test]
fn test_concat_split_run() {
    init_logging();
    let mut first = String::from(HEADER);
    first.push_str(&fep_window("0.0", "0.5", &[(100, 0.25), (200, 0.5)]));
    let mut second = String::from(HEADER);
    second.push_str(&fep_window("0.5", "1.0", &[(300, 0.75)]));

    let (_dir1, first_path) = create_test_fepout(&first);
    let (_dir2, second_path) = create_test_fepout(&second);
    let options = NamdOptions::builder().trailing_group(false).build().unwrap();

    let u_nk = UNk::concat(&[
        extract_u_nk_with(&first_path, &options).unwrap(),
        extract_u_nk_with(&second_path, &options).unwrap(),
    ]);

    assert_eq!(u_nk.states(), &["0.00", "0.50", "1.00"]);
    assert_eq!(u_nk.n_rows(), 3);
    assert_eq!(u_nk.row(2).unwrap().to_vec(), vec![0.0, 0.0, 0.75]);
    assert_eq!(u_nk.column("0.50").unwrap().to_vec(), vec![0.25, 0.5, 0.0]);
}

#[test]
fn test_u_kn_from_file() {
    let (_dir, file_path) = create_test_fepout(&forward_file());
    let u_nk = extract_u_nk(&file_path).unwrap();

    let (u_kn, n_k) = u_nk.u_kn().unwrap();
    assert_eq!(u_kn.dim(), (3, 6));
    assert_eq!(n_k.iter().sum::<usize>(), 6);
    assert_eq!(u_kn.row(1).to_vec(), vec![0.25, 0.5, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(u_kn.row(2).to_vec(), vec![0.0, 0.0, 0.75, 1.0, 0.0, 0.0]);
}

#[test]
fn test_no_windows() {
    let (_dir, file_path) = create_test_fepout(HEADER);
    let result = extract_u_nk(&file_path);
    assert!(matches!(result, Err(FepError::NoData)));
}

#[test]
fn test_malformed_frame() {
    let mut content = String::from(HEADER);
    content.push_str("#STARTING COLLECTION OF ENSEMBLE AVERAGE\n");
    content.push_str("FepEnergy:       100     -1.2345     -1.2300      0.5000      0.5100      oops\n");
    let (_dir, file_path) = create_test_fepout(&content);

    match extract_u_nk(&file_path) {
        Err(FepError::FormatViolation { line, field, found }) => {
            assert_eq!(line, 4);
            assert_eq!(field, 6);
            assert_eq!(found.as_deref(), Some("oops"));
        }
        other => panic!("expected a format violation, got {:?}", other),
    }
}

#[test]
fn test_truncated_run() {
    init_logging();
    let mut content = forward_file();
    content.push_str("#NEW FEP WINDOW: LAMBDA SET TO 1.0 LAMBDA2 1.0\n");
    content.push_str("#STARTING COLLECTION OF ENSEMBLE AVERAGE\n");
    content.push_str(
        "FepEnergy:       500     -1.2345     -1.2300      0.5000      0.5100      0.1000      0.1000    300.0000      0.1000\n",
    );
    let (_dir, file_path) = create_test_fepout(&content);

    let u_nk = extract_u_nk(&file_path).unwrap();
    assert_eq!(u_nk.n_rows(), 6);

    let strict = NamdOptions::builder()
        .open_window(OpenWindowPolicy::Error)
        .build()
        .unwrap();
    assert!(matches!(
        extract_u_nk_with(&file_path, &strict),
        Err(FepError::OpenWindow { .. })
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let result = extract_u_nk(dir.path().join("missing.fepout"));
    assert!(matches!(result, Err(FepError::Io(_))));
}
