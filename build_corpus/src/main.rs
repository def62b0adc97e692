use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use serde::Deserialize;
use tagnet::{Corpus, Document, TagNetwork, TagVocabulary};
use tagnet_rules::token_filters::StopWordFilter;
use tagnet_rules::TextCleaner;

#[derive(Parser, Debug)]
#[clap(
    name = "build_corpus",
    about = "A program to build a Tagnet corpus from a CSV file of messages."
)]
struct Args {
    /// CSV file with `Id`, `Title`, `Body`, and `Tags` columns. Tags are separated by spaces.
    #[clap(long)]
    messages: PathBuf,

    /// File whose first line lists the tags to keep, separated by spaces.
    #[clap(long)]
    tags: PathBuf,

    /// Output path of the corpus file.
    #[clap(long)]
    corpus_out: PathBuf,

    /// Stop-word file with one word per line.
    #[clap(long)]
    stop_words: Option<PathBuf>,

    /// Split titles and bodies on whitespace only. Use it for messages that are already
    /// cleaned.
    #[clap(long)]
    no_clean: bool,

    /// Skips the first N messages that carry a kept tag.
    #[clap(long, default_value = "0")]
    skip: usize,

    /// Stops after N documents.
    #[clap(long)]
    limit: Option<usize>,

    /// Writes the co-occurring tag pairs and their counts to this CSV file.
    #[clap(long)]
    edges_out: Option<PathBuf>,

    /// Prints the number of documents per number of tags.
    #[clap(long)]
    tag_hist: bool,
}

#[derive(Deserialize)]
struct MessageRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Body")]
    body: String,
    #[serde(rename = "Tags")]
    tags: String,
}

fn read_tag_list(path: &Path) -> Result<TagVocabulary, Box<dyn std::error::Error>> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    Ok(TagVocabulary::new(line.split_whitespace())?)
}

fn write_edges(
    path: &Path,
    corpus: &Corpus,
    tags: &TagVocabulary,
) -> Result<(), Box<dyn std::error::Error>> {
    let network = TagNetwork::build(corpus, &corpus.doc_ids(), tags)?;
    let mut wtr = csv::Writer::from_path(path)?;
    let mut n_pairs = 0;
    for (a, b, count) in network.co_occurrences() {
        let count = count.to_string();
        wtr.write_record([tags.name(a), tags.name(b), count.as_str()])?;
        n_pairs += 1;
    }
    wtr.flush()?;
    info!("{} tag pairs", n_pairs);
    Ok(())
}

fn print_tag_hist(corpus: &Corpus, tags: &TagVocabulary) {
    let hist = corpus.tag_length_histogram(tags);
    let mut total = 0;
    for (n_tags, n_docs) in &hist {
        println!("{} : {}", n_tags, n_docs);
        total += n_tags * n_docs;
    }
    if !corpus.is_empty() {
        println!("Average: {}", total as f64 / corpus.len() as f64);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let tags = read_tag_list(&args.tags)?;
    info!("{} tags", tags.len());

    let cleaner = if args.no_clean {
        TextCleaner::new()
    } else {
        let stop_words = match &args.stop_words {
            Some(path) => StopWordFilter::from_reader(BufReader::new(File::open(path)?))?,
            None => StopWordFilter::default(),
        };
        info!("{} stop words", stop_words.len());
        TextCleaner::standard(stop_words)
    };

    info!("Loading messages...");
    let mut rdr = csv::Reader::from_reader(File::open(&args.messages)?);
    let mut corpus = Corpus::new();
    let mut n_raw = 0;
    let mut n_kept = 0;
    for result in rdr.deserialize() {
        let record: MessageRecord = result?;
        n_raw += 1;
        let doc_tags: Vec<&str> = record
            .tags
            .split_whitespace()
            .filter(|t| tags.id(t).is_some())
            .collect();
        if doc_tags.is_empty() {
            continue;
        }
        n_kept += 1;
        if n_kept <= args.skip {
            continue;
        }
        let doc = Document::new(
            record.id.as_str(),
            doc_tags,
            cleaner.word_counts(&record.title),
            cleaner.word_counts(&record.body),
        );
        if let Err(e) = corpus.push_document(doc) {
            warn!("skipped message: {e}");
            continue;
        }
        if args.limit.map_or(false, |limit| corpus.len() >= limit) {
            break;
        }
    }
    info!("{} of {} messages kept", corpus.len(), n_raw);

    if args.tag_hist {
        print_tag_hist(&corpus, &tags);
    }
    if let Some(path) = &args.edges_out {
        info!("Writing edge list...");
        write_edges(path, &corpus, &tags)?;
    }

    info!("Saving corpus file...");
    let mut f = zstd::Encoder::new(File::create(args.corpus_out)?, 19)?;
    corpus.write(&mut f)?;
    f.finish()?;

    Ok(())
}
