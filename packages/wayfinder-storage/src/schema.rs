pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_region_boundaries.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_region_boundaries.sql")),
				"tables/002_region_embeddings.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_region_embeddings.sql")),
				"tables/003_location_aliases.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_location_aliases.sql")),
				"tables/004_unresolved_location_queries.sql" => out.push_str(include_str!(
					"../../../sql/tables/004_unresolved_location_queries.sql"
				)),
				"tables/005_instructor_metrics.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_instructor_metrics.sql")),
				"tables/006_embedding_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_embedding_cache.sql")),
				"tables/007_cache_locks.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_cache_locks.sql")),
				_ => {},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_include() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));

		for table in [
			"region_boundaries",
			"region_embeddings",
			"location_aliases",
			"unresolved_location_queries",
			"instructor_metrics",
			"embedding_cache",
			"cache_locks",
		] {
			assert!(
				sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
				"missing table {table}"
			);
		}
	}
}
