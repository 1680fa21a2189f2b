use sift::summarize::RunDetail;
use sift::{ClusterSummarizer, Linkage, Method, ObservationTable};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=sift=debug shows per-restart and per-merge events.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut table = ObservationTable::new(["site", "x", "y"])?;
    for (site, x, y) in [
        ("a", 0.0, 0.0),
        ("b", 0.0, 1.0),
        ("c", 1.0, 0.0),
        ("d", 10.0, 10.0),
        ("e", 10.0, 11.0),
        ("f", 11.0, 10.0),
    ] {
        table.push(vec![site.into(), x.into(), y.into()])?;
    }

    for method in [
        Method::Hierarchical {
            linkage: Linkage::Complete,
        },
        Method::kmeans(42),
    ] {
        let run = ClusterSummarizer::new(["x", "y"])
            .with_k(2)
            .with_method(method)
            .run(&table)?;

        match &run.detail {
            RunDetail::Hierarchical(d) => println!("hierarchical, heights {:?}", d.heights()),
            RunDetail::Kmeans(fit) => println!(
                "k-means, restart {} won with WCSS {:.3} after {} iterations",
                fit.restart, fit.tot_withinss, fit.iterations
            ),
        }
        println!("  labels {:?}", run.assignment.labels());
        for s in &run.summaries {
            let stats: Vec<String> = s
                .columns
                .iter()
                .map(|c| format!("{}={:.2}±{:.2}", c.column, c.mean, c.std_dev))
                .collect();
            println!("  cluster {} (n={}): {}", s.label, s.count, stats.join(" "));
        }
    }

    Ok(())
}
