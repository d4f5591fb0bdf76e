use alchem_rs::{
    extract_u_nk, BarEstimator, FepEstimator, FreeEnergyDifferences, MbarEstimator, UNk,
};
use anyhow::{bail, Result};
use itertools::Itertools;

/// Print the free energy of every state relative to the first one
fn report(name: &str, result: &FreeEnergyDifferences) {
    println!("{}", name);
    for (k, state) in result.states().iter().enumerate() {
        println!(
            "  {:>6}  {:>10.4} +- {:.4}",
            state,
            result.delta_f()[[0, k]],
            result.d_delta_f()[[0, k]]
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        bail!("usage: fep <file.fepout>...");
    }

    // Windows split across several files are joined into one table
    let tables = paths.iter().map(extract_u_nk).collect::<Result<Vec<_>, _>>()?;
    let u_nk = UNk::concat(&tables);

    println!(
        "{} frames over states {}",
        u_nk.n_rows(),
        u_nk.states().iter().join(", ")
    );
    println!("samples per state: {}", u_nk.samples_per_state()?);

    let mbar = MbarEstimator::builder().verbose(true).build()?.fit(&u_nk)?;
    report("MBAR", &mbar);

    let bar = BarEstimator::default().fit(&u_nk)?;
    report("BAR", &bar);

    if let (Some((mbar_df, mbar_ddf)), Some((bar_df, bar_ddf))) =
        (mbar.end_to_end(), bar.end_to_end())
    {
        println!(
            "end to end: MBAR {:.4} +- {:.4}, BAR {:.4} +- {:.4}",
            mbar_df, mbar_ddf, bar_df, bar_ddf
        );
    }

    Ok(())
}
