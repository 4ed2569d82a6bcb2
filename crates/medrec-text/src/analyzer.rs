use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

/// English stop words removed before weighting.
pub const STOP_WORDS: &[&str] = &[
	"a","about","above","after","again","against","all","also","am","an","and","any","are","as","at",
	"be","because","been","before","being","below","between","both","but","by",
	"can","could","did","do","does","doing","down","during","each","else","etc","ever","every",
	"few","for","from","further","had","has","have","having","he","her","here","hers","herself","him",
	"himself","his","how","however","i","if","in","into","is","it","its","itself","just",
	"me","more","most","must","my","myself","no","nor","not","now","of","off","on","once","only","or",
	"other","our","ours","ourselves","out","over","own","same","shall","she","should","so","some","such",
	"than","that","the","their","theirs","them","themselves","then","there","these","they","this","those",
	"through","to","too","under","until","up","upon","very","was","we","were","what","when","where",
	"which","while","who","whom","whose","why","will","with","within","without","would","yet","you",
	"your","yours","yourself","yourselves",
];

/// Tokens shorter than this are dropped after analysis.
const MIN_TOKEN_CHARS: usize = 2;

pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build()
}

/// Reusable analyzer; Tantivy needs `&mut` access to produce a token stream.
pub struct Tokenizer {
	analyzer: TextAnalyzer,
}

impl Default for Tokenizer {
	fn default() -> Self { Self { analyzer: build_analyzer() } }
}

impl Tokenizer {
	pub fn new() -> Self { Self::default() }

	pub fn tokens(&mut self, text: &str) -> Vec<String> {
		let mut out = Vec::new();
		let mut stream = self.analyzer.token_stream(text);
		while stream.advance() {
			let token = &stream.token().text;
			if token.chars().count() >= MIN_TOKEN_CHARS { out.push(token.clone()); }
		}
		out
	}
}

/// Lowercased, stop-word free tokens of `text` in document order.
pub fn tokenize(text: &str) -> Vec<String> {
	Tokenizer::new().tokens(text)
}
