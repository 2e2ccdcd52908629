//! Plain-text report builder shared by all engines.

/// Significance marker for a p-value.
///
/// `***` below 0.001, `**` below 0.01, `*` below 0.05, otherwise `ns`.
pub fn significance_stars(p: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else {
        "ns"
    }
}

/// Format a p-value with four decimals, switching to `< 0.0001` for tiny values.
pub fn format_p_value(p: f64) -> String {
    if p < 0.0001 {
        "< 0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}

/// Incremental builder for `=== Title ===` style reports.
#[derive(Debug, Default, Clone)]
pub struct TextReport {
    buf: String,
    sections: usize,
}

impl TextReport {
    pub fn new(title: &str) -> Self {
        Self {
            buf: format!("=== {} ===\n", title),
            sections: 0,
        }
    }

    /// Start the next numbered section.
    pub fn section(&mut self, heading: &str) -> &mut Self {
        self.sections += 1;
        self.buf
            .push_str(&format!("\n{}. {}\n", self.sections, heading));
        self
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    /// Right-aligned table; the first column is left-aligned.
    pub fn table<S: AsRef<str>>(&mut self, header: &[S], rows: &[Vec<String>]) -> &mut Self {
        let n_cols = header.len();
        let mut widths: Vec<usize> = header.iter().map(|h| h.as_ref().chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate().take(n_cols) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let render = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == 0 {
                        format!("{:<width$}", cell, width = widths[i])
                    } else {
                        format!("{:>width$}", cell, width = widths[i])
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header_line = render(header.iter().map(|h| h.as_ref()).collect());
        let rule = "-".repeat(header_line.chars().count());
        self.line(&header_line);
        self.line(&rule);
        for row in rows {
            self.line(render(row.iter().map(String::as_str).collect()));
        }
        self
    }

    pub fn finish(&self) -> String {
        self.buf.clone()
    }
}
