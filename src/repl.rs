use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::debug;

use crate::chain::Chain;

const EXIT_KEYWORDS: [&str; 3] = ["quit", "exit", "q"];

pub fn is_exit_keyword(input: &str) -> bool {
    let input = input.trim();
    EXIT_KEYWORDS
        .iter()
        .any(|keyword| input.eq_ignore_ascii_case(keyword))
}

/// Reads questions line by line until an exit keyword or end of input.
pub async fn run_loop<R, W>(chain: &mut (dyn Chain + Send), input: R, output: &mut W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Database Query Assistant")?;
    writeln!(output, "Type 'quit' to exit")?;

    let mut lines = input.lines();

    loop {
        write!(output, "\nEnter your database question: ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            debug!("end of input");
            break;
        };
        let line = line?;

        if is_exit_keyword(&line) {
            break;
        }

        let response = match chain.run(line).await {
            Ok(response) => response,
            Err(e) => format!("Error: {}", e),
        };

        writeln!(output, "\nResponse: {}", response)?;
        writeln!(output, "\n{}", "=".repeat(50))?;
    }

    Ok(())
}
