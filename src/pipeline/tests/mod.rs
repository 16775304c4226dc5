//! Integration tests for the matching pipeline
//!
//! Tests the complete pipeline against small synthetic CMC catalogs and
//! observational tables.


use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Paths of a synthetic set of pipeline inputs
pub struct TestInputs {
    pub catalog: PathBuf,
    pub structural: PathBuf,
    pub metallicity: PathBuf,
    pub output: PathBuf,
}

/// Write one CMC model directory
///
/// Times are in code units with 1 code unit = 1000 Myr, masses in units of
/// 1e5 Msun and lengths in parsecs.
pub fn write_model(catalog: &Path, key: &str, mass: f64) {
    let dir = catalog.join(key);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("initial.conv.sh"),
        "# conversion factors\n\
         massunitcgs=1.98892e38\n\
         massunitmsun=100000.0\n\
         lengthunitcgs=3.0857e18\n\
         lengthunitparsec=1.0\n\
         timeunitcgs=3.15576e16\n\
         timeunitsmyr=1000.0\n",
    )
    .unwrap();

    let mut content = String::from("# Dynamical information [code units]\n");
    content.push_str("#1.t #2.Dt #3.tcount #4.N #5.M #6.rc_spitzer #7.r_h\n");
    for (tcount, t) in [0.0, 5.0, 10.0, 11.0, 12.0, 13.0, 14.0].iter().enumerate() {
        content.push_str(&format!(
            "{} 0.001 {} 100000 {} 0.5 2.0\n",
            t, tcount, mass
        ));
    }
    fs::write(dir.join("initial.dyn.dat"), content).unwrap();
}

/// Three models over two (rg, Z) cells and six clusters, one unmeasured
///
/// Non-empty bins: (rg=2, [Fe/H]=-2) with clusters A and B, and
/// (rg=20, [Fe/H]=-1) with cluster C. Clusters D and E fall in bins without
/// models.
pub fn create_test_inputs(temp_dir: &TempDir) -> TestInputs {
    let catalog = temp_dir.path().join("models");
    write_model(&catalog, "N1e5_rv1_rg2_Z0.0002", 1.0);
    write_model(&catalog, "N2e5_rv1_rg2_Z0.0002_v2", 3.0);
    write_model(&catalog, "N1e5_rv1_rg20_Z0.002", 2.0);

    let structural = temp_dir.path().join("baumgardt.txt");
    fs::write(
        &structural,
        "Cluster   Mass     rc    rh,m   R_GC   sigma\n\
         A         1.1e5    0.5   2.0    1.0    5.1\n\
         B         3.0e5    0.5   2.0    5.0    7.9\n\
         C         2.2e5    0.5   2.0    30.0   4.4\n\
         D         1.0e5    0.5   2.0    3.0    3.0\n\
         E         1.0e5    0.5   2.0    15.0   2.5\n\
         F         1.0e5    0.5   2.0    4.0    2.0\n",
    )
    .unwrap();

    let metallicity = temp_dir.path().join("harris.txt");
    fs::write(
        &metallicity,
        "Cluster  [Fe/H]  wt\n\
         E        -2.2    3\n\
         D        -0.7    5\n\
         C        -0.5    8\n\
         B        -1.8    2\n\
         A        -2.1    6\n\
         F        -100    0\n",
    )
    .unwrap();

    TestInputs {
        catalog,
        structural,
        metallicity,
        output: temp_dir.path().join("output"),
    }
}
