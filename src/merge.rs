//! Merging of dataset shards (`cgm_data_1.csv`, `cgm_data_2.csv`, ...) into
//! one logical dataset.

/// Concatenates shard texts.
///
/// The first shard is kept verbatim, so its metadata and header lines are the
/// merged dataset's. Every later shard contributes only its non-blank lines
/// after line 2, in shard order.
pub fn merge_csv_files<S: AsRef<str>>(shards: &[S]) -> String {
    let Some((first, rest)) = shards.split_first() else {
        return String::new();
    };

    let mut merged = first.as_ref().to_string();
    for shard in rest {
        for line in data_lines(shard.as_ref()) {
            if !merged.is_empty() && !merged.ends_with('\n') {
                merged.push('\n');
            }
            merged.push_str(line);
        }
    }
    merged
}

/// Non-blank lines after the metadata and header lines.
pub fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().skip(2).filter(|line| !line.trim().is_empty())
}

pub fn count_data_rows(text: &str) -> usize {
    data_lines(text).count()
}
