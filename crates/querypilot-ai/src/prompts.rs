//! Fixed system prompts, one per agent phase, plus the non-agentic SQL
//! synthesis prompt. Each phase gateway is bound to exactly one of these.

/// Phase 1: discover table names.
pub const TABLE_DISCOVERY: &str = "You are a helpful assistant tasked with performing \
database operations on a set of inputs. Use the provided tool to list the tables \
available in the database.";

/// Phase 2: fetch the structure of the tables implicated by the request.
pub const STRUCTURE_DISCOVERY: &str = "You are a helpful assistant tasked with performing \
database operations. Given the database URL and the table names already discovered, \
use the provided tool to fetch the structure of the tables relevant to the request.";

/// Phase 3: execute the synthesized query.
pub const QUERY_EXECUTION: &str = "You are an intelligent and precise assistant responsible \
for executing postgres queries based strictly on the provided database table structure \
and input query. Always enclose table names and column names in double quotes \
(e.g., \"TableName\" and \"ColumnName\" and \"TableName\".\"ColumnName\") to ensure \
postgres syntax correctness. Focus solely on executing the query without additional \
explanations or modifications.";

/// The one-shot SQL synthesis prompt: table structure plus the original
/// natural-language requirement in, exactly one SQL statement out.
pub fn synthesis(table_structure: &str, requirement: &str) -> String {
    format!(
        "Generate a PostgreSQL query based strictly on the provided table structure and \
input conditions.\n\
Table Structure:\n\
{table_structure}\n\
Query Requirement:\n\
{requirement}\n\
Generate only the PostgreSQL query without any additional text, explanation, or formatting.\n\
Strictly use the provided table structure and do not infer missing columns or relationships.\n\
Always enclose table names and column names in double quotes \
(e.g., \"TableName\", \"ColumnName\", \"TableName\".\"ColumnName\").\n\
Ensure proper joins based on the primary and foreign key relationships in the table structure.\n\
Optimize query performance by selecting only necessary columns and avoiding redundant joins.\n\
Format the output as a valid PostgreSQL query ready for execution.\n\
Return only the PostgreSQL query\u{2014}nothing else."
    )
}
