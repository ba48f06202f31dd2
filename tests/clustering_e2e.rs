//! End-to-end tests: distance file in, dendrogram and text output out.

use std::io::Write;

use nnchain::{
    AgglomerativeClusterer, ClusterError, ClusterParams, DendrogramWriter, Linkage,
};

const FOUR: &str = "\
# A and B are close, C and D are close
A\tB\t0.1
A\tC\t0.9
A\tD\t0.9
B\tC\t0.9
B\tD\t0.9
C\tD\t0.2
";

fn names_of(d: &nnchain::Dendrogram, labels: &[usize]) -> Vec<String> {
    let mut names: Vec<String> = labels
        .iter()
        .map(|&l| d.name(l).unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn four_item_average_linkage_scenario() {
    let dendrogram = AgglomerativeClusterer::from_reader(FOUR.as_bytes(), 4, ClusterParams::default())
        .expect("load")
        .cluster()
        .expect("cluster");

    assert_eq!(dendrogram.len(), 7);
    let merges: Vec<_> = dendrogram.merges().collect();
    assert_eq!(merges.len(), 3);

    let (a, b, c, d) = (
        dendrogram.label_of("A").unwrap(),
        dendrogram.label_of("B").unwrap(),
        dendrogram.label_of("C").unwrap(),
        dendrogram.label_of("D").unwrap(),
    );

    assert_eq!((merges[0].left, merges[0].right), (a, b));
    assert!((merges[0].distance - 0.1).abs() < 1e-6);
    assert_eq!((merges[1].left, merges[1].right), (c, d));
    assert!((merges[1].distance - 0.2).abs() < 1e-6);
    assert_eq!(
        (merges[2].left, merges[2].right),
        (merges[0].label, merges[1].label)
    );
    assert!((merges[2].distance - 0.9).abs() < 1e-6);

    let root = dendrogram.root();
    assert_eq!(root.label(), 6);
    assert_eq!(root.leaf_count(), 4);
}

#[test]
fn four_item_cut_levels() {
    let dendrogram = AgglomerativeClusterer::from_reader(FOUR.as_bytes(), 4, ClusterParams::default())
        .unwrap()
        .cluster()
        .unwrap();

    assert_eq!(dendrogram.flat_clusters(0.05).len(), 4);

    let clusters = dendrogram.flat_clusters(0.25);
    let mut named: Vec<Vec<String>> = clusters.iter().map(|c| names_of(&dendrogram, c)).collect();
    named.sort();
    assert_eq!(named, vec![vec!["A", "B"], vec!["C", "D"]]);

    let all = dendrogram.flat_clusters(0.9);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].len(), 4);
}

#[test]
fn incomplete_input_never_clusters() {
    let five_pairs: String = FOUR.lines().filter(|l| *l != "C\tD\t0.2").map(|l| format!("{l}\n")).collect();
    let err = AgglomerativeClusterer::from_reader(five_pairs.as_bytes(), 4, ClusterParams::default())
        .unwrap_err();
    match err {
        ClusterError::CountMismatch {
            expected_pairs,
            pairs,
            ..
        } => {
            assert_eq!(expected_pairs, 6);
            assert_eq!(pairs, 5);
        }
        other => panic!("expected CountMismatch, got {other:?}"),
    }
}

#[test]
fn declared_count_too_small_fails() {
    let err = AgglomerativeClusterer::from_reader(FOUR.as_bytes(), 3, ClusterParams::default())
        .unwrap_err();
    assert!(matches!(err, ClusterError::LabelOutOfRange { label: 3, limit: 3 }));
}

#[test]
fn declared_count_too_large_fails() {
    let err = AgglomerativeClusterer::from_reader(FOUR.as_bytes(), 5, ClusterParams::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ClusterError::CountMismatch {
            expected_items: 5,
            items: 4,
            ..
        }
    ));
}

#[test]
fn loads_from_file_and_writes_both_formats() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FOUR.as_bytes()).unwrap();
    file.flush().unwrap();

    let dendrogram = AgglomerativeClusterer::from_path(file.path(), 4, ClusterParams::default())
        .unwrap()
        .cluster()
        .unwrap();
    let writer = DendrogramWriter::new(&dendrogram);

    let mut tree = Vec::new();
    writer.write_tree(&mut tree).unwrap();
    let tree = String::from_utf8(tree).unwrap();
    assert_eq!(tree.lines().count(), 1 + 7);
    assert!(tree.starts_with("ClusterLabel\tClusterName\tLeftChildLabel\tRightChildLabel\tDistance\n"));
    assert_eq!(tree.lines().nth(1), Some("6\tNOT_LEAF_NODE\t4\t5\t0.900000"));
    assert_eq!(tree.lines().last(), Some("0\tA\t-1\t-1\t0.000000"));

    let mut clusters = Vec::new();
    writer.write_clusters(&mut clusters, 0.15).unwrap();
    let clusters = String::from_utf8(clusters).unwrap();
    assert_eq!(
        clusters,
        "ClusterSize\tClusterNodes[1,2,3...]\n2\tA\tB\n1\tC\n1\tD\n"
    );
}

#[test]
fn same_input_same_dendrogram() {
    for linkage in Linkage::ALL {
        let params = ClusterParams::default().with_linkage(linkage);
        let run = || {
            AgglomerativeClusterer::from_reader(FOUR.as_bytes(), 4, params)
                .unwrap()
                .cluster()
                .unwrap()
                .merges()
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run(), "{linkage} is not deterministic");
    }
}

#[test]
fn linkages_disagree_where_expected() {
    // Three items on a line at 0, 1 and 4.
    let input = "x\ty\t1\nx\tz\t4\ny\tz\t3\n";
    let root_height = |linkage: Linkage| {
        AgglomerativeClusterer::from_reader(
            input.as_bytes(),
            3,
            ClusterParams::default().with_linkage(linkage),
        )
        .unwrap()
        .cluster()
        .unwrap()
        .root()
        .merge_distance()
    };

    assert!((root_height(Linkage::Single) - 3.0).abs() < 1e-6);
    assert!((root_height(Linkage::Complete) - 4.0).abs() < 1e-6);
    assert!((root_height(Linkage::Average) - 3.5).abs() < 1e-6);
    // sqrt((2*16 + 2*9 - 1*1) / 3)
    let ward = ((2.0f32 * 16.0 + 2.0 * 9.0 - 1.0) / 3.0).sqrt();
    assert!((root_height(Linkage::Ward) - ward).abs() < 1e-5);
}
