use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use logoset::brand::{BrandMatch, Canonicalizer};
use logoset::config::Settings;
use logoset::dataset::analyze::{count_brand_images, write_report};
use logoset::dataset::inspect::inspect_dataset;
use logoset::dataset::manifest::{
    DATA_YAML, dataset_class_names, generate_from_classes_csv, merge_yaml_files,
};
use logoset::dataset::merge_csv::merge_split_csvs;
use logoset::dataset::organize::{OrganizeOptions, OrganizeSummary, Organizer};
use logoset::dataset::reduce::reduce_dataset;
use logoset::dataset::reindex::{copy_dataset, reindex_dataset};
use logoset::dataset::select::select_brands;
use logoset::dataset::split::{SplitOptions, SplitRatios, split_dataset};
use logoset::dataset::reset_dir;

#[derive(Parser, Debug)]
#[command(
    name = "logoset",
    version,
    about = "Canonicalize brand names and prepare YOLO logo datasets"
)]
struct Cli {
    /// Settings file (default: `<config dir>/logoset/config.json`)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical brand for each name
    Canonicalize {
        /// Raw names (file stems or folder names)
        #[arg(required = true)]
        names: Vec<String>,
        /// Folder name to try before each name
        #[arg(long, value_name = "NAME")]
        dir: Option<String>,
    },

    /// List registry aliases and their canonical brands
    Brands {
        /// Only show aliases of this brand
        #[arg(long, value_name = "BRAND")]
        canonical: Option<String>,
    },

    /// Sort images and labels into per-brand folders
    Organize {
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        /// Drop brands with fewer images (default from settings)
        #[arg(long)]
        threshold: Option<usize>,
        /// Only show what would be copied
        #[arg(long)]
        dry_run: bool,
        /// Copy byte-identical images of a brand once
        #[arg(long)]
        dedupe: bool,
        /// Skip files that cannot be decoded as images
        #[arg(long)]
        verify_images: bool,
        /// Clear an existing output directory without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Count images per brand folder and write a report
    Analyze {
        #[arg(short, long, value_name = "DIR")]
        dir: PathBuf,
        #[arg(short, long, value_name = "FILE", default_value = "analysis_report.txt")]
        report: PathBuf,
    },

    /// Copy brands above a threshold into a training folder
    Select {
        #[arg(short, long, value_name = "DIR")]
        processed: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        report: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        /// Manifest path (default: `<output>.yaml`)
        #[arg(long, value_name = "FILE")]
        yaml: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        threshold: usize,
        #[arg(short, long)]
        yes: bool,
    },

    /// Split brand folders into train/val/test
    Split {
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
        #[arg(long, default_value_t = 0.8)]
        train: f64,
        #[arg(long, default_value_t = 0.1)]
        val: f64,
        #[arg(long, default_value_t = 0.1)]
        test: f64,
        /// Shuffle seed (default from settings)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Shrink a split dataset to a target training size
    Reduce {
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,
        #[arg(short, long, value_name = "DIR")]
        dest: PathBuf,
        #[arg(long, default_value_t = 1000)]
        target_train_size: usize,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rename images and labels to `<prefix>_<index>`
    Reindex {
        #[arg(short, long, value_name = "DIR")]
        dataset: PathBuf,
        #[arg(long)]
        prefix: String,
        /// Reindex a copy of the dataset made here instead
        #[arg(long, value_name = "DIR")]
        copy_to: Option<PathBuf>,
        /// Clear an existing copy directory without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Write classes.txt and data.yaml from train/_classes.csv
    Classes {
        #[arg(short, long, value_name = "DIR")]
        dataset: PathBuf,
    },

    /// Show per-split image, label and class counts
    Inspect {
        #[arg(short, long, value_name = "DIR")]
        dataset: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deep-merge two YAML files
    MergeYaml {
        first: PathBuf,
        second: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Concatenate the per-split CSV annotations of several exports
    MergeCsv {
        /// Export folders holding `train/`, `valid/` and `test/`
        #[arg(required = true)]
        bases: Vec<PathBuf>,
        /// Where `merged_<split>.csv` files are written
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Canonicalize { names, dir } => {
            let canonicalizer = settings.canonicalizer()?;
            for name in &names {
                let resolved = canonicalizer.resolve_with_dir(dir.as_deref(), name);
                println!("{}", describe_match(name, resolved.as_ref()));
            }
        }

        Commands::Brands { canonical } => {
            let canonicalizer = settings.canonicalizer()?;
            let registry = canonicalizer.registry();
            let mut shown = 0;
            for (alias, brand) in registry.iter() {
                if canonical.as_deref().is_some_and(|wanted| wanted != brand) {
                    continue;
                }
                println!("{alias:<30} → {brand}");
                shown += 1;
            }
            println!("\n{} of {} aliases", shown, registry.len());
        }

        Commands::Organize {
            source,
            output,
            threshold,
            dry_run,
            dedupe,
            verify_images,
            yes,
        } => {
            let canonicalizer = settings.canonicalizer()?;
            let options = OrganizeOptions {
                threshold: threshold.unwrap_or(settings.min_images_per_brand),
                dry_run,
                dedupe,
                verify_images,
                image_extensions: settings.image_extensions.clone(),
                label_extension: settings.label_extension.clone(),
            };
            organize(&canonicalizer, options, &source, &output, yes)?;
        }

        Commands::Analyze { dir, report } => {
            println!("▶ Analyzing {}", dir.display());
            let counts = count_brand_images(&dir, &settings.image_extensions)
                .with_context(|| format!("Failed to analyze {}", dir.display()))?;
            write_report(&counts, &report)
                .with_context(|| format!("Failed to write {}", report.display()))?;
            for count in counts.iter().take(10) {
                println!("   {:<30} {}", count.brand, count.images);
            }
            println!("✅ {} brands, report at {}", counts.len(), report.display());
        }

        Commands::Select {
            processed,
            report,
            output,
            yaml,
            threshold,
            yes,
        } => {
            let yaml_path = yaml.unwrap_or_else(|| output.with_extension("yaml"));
            if !confirm_clear(&output, yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let summary = select_brands(&processed, &report, &output, &yaml_path, threshold)
                .context("Failed to select brands")?;
            if summary.selected.is_empty() {
                println!("No brands with at least {threshold} images; nothing copied.");
                return Ok(());
            }
            for brand in &summary.missing {
                println!("   ⚠️  No folder for {brand}");
            }
            println!(
                "✅ {} brands, {} files copied to {}",
                summary.selected.len(),
                summary.copied_files,
                output.display()
            );
            println!("📄 Manifest written to {}", yaml_path.display());
        }

        Commands::Split {
            source,
            output,
            train,
            val,
            test,
            seed,
        } => {
            let options = SplitOptions {
                ratios: SplitRatios { train, val, test },
                seed: seed.unwrap_or(settings.split_seed),
                image_extensions: settings.image_extensions.clone(),
                label_extension: settings.label_extension.clone(),
            };
            let bar = progress_bar("Splitting brands")?;
            let summary = benchmark("splitting dataset", || {
                split_dataset(&source, &output, &options, &bar)
            })
            .with_context(|| format!("Failed to split {}", source.display()))?;
            bar.finish_and_clear();

            println!(
                "✅ {} classes: {} train, {} val, {} test",
                summary.classes.len(),
                summary.train,
                summary.val,
                summary.test
            );
            if summary.unlabeled > 0 {
                println!("   ⚠️  {} images without labels left out", summary.unlabeled);
            }
            println!("📄 Manifest written to {}", summary.yaml_path.display());
        }

        Commands::Reduce {
            source,
            dest,
            target_train_size,
            seed,
        } => {
            let summary = reduce_dataset(
                &source,
                &dest,
                target_train_size,
                seed.unwrap_or(settings.split_seed),
                &settings.image_extensions,
                &settings.label_extension,
            )
            .with_context(|| format!("Failed to reduce {}", source.display()))?;

            println!("▶ Reduction factor {:.4}", summary.factor);
            for split in &summary.splits {
                println!(
                    "   {:<6} {} → {} ({} without labels)",
                    split.split, split.original, split.copied, split.missing_labels
                );
            }
            if !summary.yaml_copied {
                println!("   ⚠️  No {DATA_YAML} found in {}", source.display());
            }
            println!("✅ Reduced dataset at {}", dest.display());
        }

        Commands::Reindex {
            dataset,
            prefix,
            copy_to,
            yes,
        } => {
            let target = match copy_to {
                Some(copy) => {
                    if !confirm_clear(&copy, yes)? {
                        println!("Aborted.");
                        return Ok(());
                    }
                    println!("▶ Copying {} → {}", dataset.display(), copy.display());
                    let copied = copy_dataset(&dataset, &copy)
                        .with_context(|| format!("Failed to copy {}", dataset.display()))?;
                    println!("   {copied} files copied");
                    copy
                }
                None => dataset,
            };
            let summary = reindex_dataset(&target, &prefix, &settings.label_extension)
                .with_context(|| format!("Failed to reindex {}", target.display()))?;
            println!(
                "✅ Renamed {} images and {} labels in {}",
                summary.images,
                summary.labels,
                target.display()
            );
            if summary.yaml_updated {
                println!("📄 Updated {}", target.join(DATA_YAML).display());
            }
        }

        Commands::Classes { dataset } => {
            let manifest = generate_from_classes_csv(&dataset)
                .with_context(|| format!("Failed to read classes of {}", dataset.display()))?;
            println!("✅ {} classes written", manifest.names.len());
        }

        Commands::Inspect { dataset, json } => {
            let names = dataset_class_names(&dataset)
                .with_context(|| format!("No class names found for {}", dataset.display()))?;
            let report = inspect_dataset(
                &dataset,
                &names,
                &settings.image_extensions,
                &settings.label_extension,
            )
                .with_context(|| format!("Failed to inspect {}", dataset.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }

        Commands::MergeYaml {
            first,
            second,
            output,
        } => {
            merge_yaml_files(&first, &second, &output).context("Failed to merge YAML files")?;
            println!("✅ Merged into {}", output.display());
        }

        Commands::MergeCsv { bases, output } => {
            let merges = merge_split_csvs(&bases, &output).context("Failed to merge CSV files")?;
            if merges.is_empty() {
                println!("No CSV files found under the given folders.");
            }
            for merge in &merges {
                println!(
                    "✅ {} with {} rows from {} files",
                    merge.path.display(),
                    merge.rows,
                    merge.inputs.len()
                );
            }
        }
    }

    Ok(())
}

fn organize(
    canonicalizer: &Canonicalizer,
    options: OrganizeOptions,
    source: &Path,
    output: &Path,
    yes: bool,
) -> Result<()> {
    println!("▶ Organizing {} → {}", source.display(), output.display());
    let organizer = Organizer::new(canonicalizer, options);
    let bar = progress_bar("Resolving brands")?;
    let plan = benchmark("resolving brands", || organizer.plan(source, output, &bar))
        .with_context(|| format!("Failed to plan {}", source.display()))?;

    if organizer.options().dry_run {
        bar.finish_and_clear();
        for copy in &plan.copies {
            println!(
                "   📦 [dry-run] COPY {} → {}",
                copy.image.display(),
                copy.dest_image.display()
            );
        }
        print_organize_summary(&plan.summary);
        println!("\n⚠️  Dry-run only; no files were changed.");
        return Ok(());
    }

    if !bar.suspend(|| confirm_clear(output, yes))? {
        bar.finish_and_clear();
        println!("Aborted; {} left untouched.", output.display());
        return Ok(());
    }
    reset_dir(output).with_context(|| format!("Failed to clear {}", output.display()))?;

    let summary = benchmark("copying images", || organizer.execute(plan, output, &bar))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    bar.finish_and_clear();

    print_organize_summary(&summary);
    println!("✅ Organized into {}", output.display());
    Ok(())
}

fn print_organize_summary(summary: &OrganizeSummary) {
    println!(
        "\n✨ {} of {} images into {} brands",
        summary.processed,
        summary.total_images,
        summary.brands.len()
    );
    println!(
        "   skipped {} · below threshold {} · duplicates {} · unreadable {}",
        summary.skipped, summary.below_threshold, summary.duplicates, summary.unreadable
    );
    println!(
        "   fallback names {} · missing labels {}",
        summary.fallback_labels, summary.missing_labels
    );
}

/// One line per name: the brand and the stage that produced it.
fn describe_match(name: &str, resolved: Option<&BrandMatch>) -> String {
    match resolved {
        Some(found) => format!("{name} → {} ({:?})", found.brand, found.kind),
        None => format!("{name} → (rejected)"),
    }
}

/// Asks before clearing a non-empty directory. `yes` skips the prompt.
fn confirm_clear(dir: &Path, yes: bool) -> Result<bool> {
    let occupied = dir
        .read_dir()
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if !occupied || yes {
        return Ok(true);
    }
    let confirmed = Confirm::new()
        .with_prompt(format!("{} is not empty. Clear it?", dir.display()))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

fn progress_bar(message: &'static str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}",
    )?);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    println!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
