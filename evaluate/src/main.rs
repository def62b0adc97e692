use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tagnet::{
    train_and_test, Classifier, Corpus, Field, FoldReport, GraphGuided, KFold, Method, Mixture,
    NaiveBayes,
};

#[derive(Parser, Debug)]
#[clap(
    name = "evaluate",
    about = "A program to evaluate the accuracy of Tagnet classifiers."
)]
struct Args {
    /// Classifier: {nb, ngnb, pmm}.
    /// nb: binary relevance Naive Bayes.
    /// ngnb: Naive Bayes guided by the tag co-occurrence graph.
    /// pmm: parametric mixture model.
    method: Method,

    /// Corpus file built by `build_corpus`.
    corpus: PathBuf,

    /// Trains on the whole corpus and tests on this corpus instead of cross-validating.
    #[clap(long)]
    test_corpus: Option<PathBuf>,

    /// Number of folds.
    #[clap(short, long, default_value = "4")]
    k: usize,

    /// Number of folds to run.
    #[clap(long)]
    kstop: Option<usize>,

    /// Number of randomly selected tags.
    #[clap(long)]
    ntag: Option<usize>,

    /// Number of randomly selected documents.
    #[clap(long)]
    doc_limit: Option<usize>,

    /// Do not use titles.
    #[clap(long, conflicts_with = "no_body")]
    no_title: bool,

    /// Do not use bodies.
    #[clap(long)]
    no_body: bool,

    /// Do not score the training documents of each fold.
    #[clap(long)]
    no_train_test: bool,

    /// Do not score the held-out documents of each fold.
    #[clap(long)]
    no_test: bool,

    /// Seed of the shuffles. A random seed is used if not specified.
    #[clap(long)]
    seed: Option<u64>,

    /// Maximum number of EM iterations of `pmm`.
    #[clap(long, default_value = "100")]
    max_iterations: usize,

    /// Maximum number of neighbor tags searched by `ngnb`.
    #[clap(long, default_value = "5")]
    search_limit: usize,
}

fn read_corpus(path: &Path) -> Result<Corpus, Box<dyn std::error::Error>> {
    let mut f = zstd::Decoder::new(File::open(path)?)?;
    Ok(Corpus::read(&mut f)?)
}

fn fold_row(name: &str, n_docs: usize, n_tags: usize, report: &FoldReport) -> String {
    let mut row = format!("| {} | {} | {} | {} |", name, n_docs, n_tags, report.fold);
    if let Some(e) = &report.train {
        row += &e.to_string();
    }
    if let Some(e) = &report.test {
        row += &e.to_string();
    }
    row += &format!(" {:.3} |", report.train_time.as_secs_f64());
    if let Some(t) = report.test_time {
        row += &format!(" {:.3} |", t.as_secs_f64());
    }
    row
}

fn run<C>(
    classifier: &C,
    args: &Args,
    fields: &[Field],
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>>
where
    C: Classifier + Sync,
{
    info!("Loading corpus file...");
    let corpus = read_corpus(&args.corpus)?;
    let mut tags = corpus.tag_vocabulary()?;

    if let Some(path) = &args.test_corpus {
        let test = read_corpus(path)?;
        let report = train_and_test(classifier, &corpus, &test, fields, &tags)?;
        println!("| MODEL | NDOC | NTAG | TP | FP | FN | PREC | REC | F1 |");
        if let Some(e) = &report.test {
            println!(
                "| {} | {} | {} |{}",
                classifier.name(),
                report.n_test,
                tags.len(),
                e
            );
        }
        return Ok(());
    }

    let mut ids = corpus.doc_ids();
    if let Some(n) = args.ntag {
        tags = tags.sample(n, rng)?;
        ids = corpus.restrict(&tags);
    }
    if let Some(limit) = args.doc_limit {
        ids.shuffle(rng);
        ids.truncate(limit);
    }
    info!("{} documents, {} tags", ids.len(), tags.len());

    let reports = KFold::new(args.k)
        .stop_after(args.kstop)
        .train_test(!args.no_train_test)
        .test(!args.no_test)
        .run(classifier, &corpus, fields, &ids, &tags, rng)?;

    let mut header = "| MODEL | NDOC | NTAG | FOLD |".to_string();
    if !args.no_train_test {
        header += " TrTP | TrFP | TrFN | TrPREC | TrREC | TrF1 |";
    }
    if !args.no_test {
        header += " TP | FP | FN | PREC | REC | F1 |";
    }
    header += " TTRAIN |";
    if !args.no_test {
        header += " TTEST |";
    }
    println!("{}", header);
    for report in &reports {
        println!(
            "{}",
            fold_row(classifier.name(), ids.len(), tags.len(), report)
        );
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut fields = vec![];
    if !args.no_title {
        fields.push(Field::Title);
    }
    if !args.no_body {
        fields.push(Field::Body);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    match args.method {
        Method::NaiveBayes => run(&NaiveBayes, &args, &fields, &mut rng),
        Method::GraphGuided => run(
            &GraphGuided::new().search_limit(args.search_limit),
            &args,
            &fields,
            &mut rng,
        ),
        Method::Mixture => run(
            &Mixture::new().max_iterations(args.max_iterations),
            &args,
            &fields,
            &mut rng,
        ),
    }
}
