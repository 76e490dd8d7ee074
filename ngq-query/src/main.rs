use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use clap::Parser;
use log::info;

use ngq_core::io::read_lines;
use ngq_core::{Config, CorpusStats, ProbingModel, SentenceScore};

/// Scores text with a binary n-gram language model.
#[derive(Parser)]
#[command(name = "ngq-query")]
#[command(about = "Score sentences with a binary n-gram language model")]
#[command(version)]
struct Cli {
	/// Binary model file
	model: PathBuf,

	/// Text to score, one sentence per line; standard input when absent
	input: Option<PathBuf>,

	/// Score each line without <s> and </s>
	#[arg(long)]
	null_context: bool,

	/// Print every word with its id, matched n-gram length and probability
	#[arg(long)]
	per_word: bool,

	/// Check every probing table after loading
	#[arg(long)]
	check_consistency: bool,

	/// Fail if the vocabulary has no <s> or </s>
	#[arg(long)]
	require_sentence_markers: bool,

	/// Number of scoring threads; one per CPU by default
	#[arg(short, long)]
	threads: Option<usize>,
}

impl Cli {
	fn config(&self) -> Config {
		Config {
			check_consistency: self.check_consistency,
			require_sentence_markers: self.require_sentence_markers,
			..Config::default()
		}
	}
}

/// Splits `lines` into chunks, scores each chunk on its own thread and
/// returns the scores in input order.
///
/// # Notes
/// - Uses an MPSC channel to collect `(chunk index, scores)` from threads.
/// - Threads share the model through an `Arc`; scoring never mutates it.
/// - Fails if a thread dies before sending its chunk.
fn score_lines(
	model: Arc<ProbingModel>,
	lines: Vec<String>,
	threads: usize,
	sentence_context: bool,
) -> Result<Vec<SentenceScore>, String> {
	let chunk_size = lines.len().div_ceil(threads.max(1)).max(1);

	let (tx, rx) = mpsc::channel();
	let mut chunks = 0;
	for (index, chunk) in lines.chunks(chunk_size).enumerate() {
		let tx = tx.clone();
		let chunk: Vec<String> = chunk.to_vec();
		let model = Arc::clone(&model);

		thread::spawn(move || {
			let scores: Vec<SentenceScore> = chunk
				.iter()
				.map(|line| model.score_sentence(line, sentence_context))
				.collect();
			// the receiver outlives every sender
			let _ = tx.send((index, scores));
		});
		chunks += 1;
	}
	drop(tx);

	gather(rx, chunks)
}

/// Reassembles `chunks` parts received as `(chunk index, items)` in index
/// order.
fn gather<T>(rx: mpsc::Receiver<(usize, Vec<T>)>, chunks: usize) -> Result<Vec<T>, String> {
	let mut parts: Vec<Option<Vec<T>>> = (0..chunks).map(|_| None).collect();
	for (index, items) in rx.iter() {
		parts[index] = Some(items);
	}
	let mut all = Vec::new();
	for (index, part) in parts.into_iter().enumerate() {
		match part {
			Some(items) => all.extend(items),
			None => return Err(format!("scoring thread for chunk {index} did not finish")),
		}
	}
	Ok(all)
}

fn print_sentence<W: Write>(out: &mut W, sentence: &SentenceScore, per_word: bool) -> io::Result<()> {
	if per_word {
		for word in &sentence.words {
			write!(out, "{}={} {} {}\t", word.word, word.index, word.ngram_length, word.prob)?;
		}
	}
	writeln!(out, "Total: {} OOV: {}", sentence.total, sentence.oov)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();
	let cli = Cli::parse();

	let model = ProbingModel::from_file(&cli.model, &cli.config())?;
	info!("{} loaded, vocabulary bound {}", cli.model.display(), model.vocabulary().bound());

	let lines = match &cli.input {
		Some(path) => read_lines(path)?,
		None => io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?,
	};
	let threads = cli.threads.unwrap_or_else(num_cpus::get);
	info!("scoring {} lines on {} threads", lines.len(), threads);

	let scores = score_lines(Arc::new(model), lines, threads, !cli.null_context)?;

	let stdout = io::stdout();
	let mut out = BufWriter::new(stdout.lock());
	let mut stats = CorpusStats::default();
	for sentence in &scores {
		print_sentence(&mut out, sentence, cli.per_word)?;
		stats.add(sentence);
	}
	writeln!(out, "Perplexity including OOVs:\t{}", stats.perplexity())?;
	writeln!(out, "Perplexity excluding OOVs:\t{}", stats.perplexity_excluding_oov())?;
	writeln!(out, "OOVs:\t{}", stats.oov)?;
	writeln!(out, "Tokens:\t{}", stats.tokens)?;
	out.flush()?;

	Ok(())
}
