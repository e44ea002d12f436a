//! Static dashboard page
//!
//! The page owns the refresh timers: it polls `/api/dashboard` and
//! `/api/report` on the configured periods and redraws from the JSON view.

use crate::config::Config;

/// Values substituted into the page template
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub title: String,
    pub data_refresh_secs: u64,
    pub report_refresh_secs: u64,
    pub download_path: String,
}

impl PageSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.server.title.clone(),
            data_refresh_secs: config.refresh.data_secs,
            report_refresh_secs: config.refresh.report_secs,
            download_path: config.server.download_path.clone(),
        }
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
<style>
  body { background: #121212; color: white; font-family: sans-serif; padding: 20px; }
  h1, h2 { text-align: center; }
  .badge { display: inline-block; padding: 4px 12px; border-radius: 5px; font-weight: bold; }
  .success { background: #00bc8c; } .warning { background: #f39c12; } .danger { background: #e74c3c; }
  pre#report { padding: 10px; border: 1px solid white; background: #1e1e1e; border-radius: 5px; white-space: pre-line; font-size: 16px; }
  #message { text-align: center; font-size: 20px; }
</style>
</head>
<body>
<h1>{{TITLE}}</h1>
<div>
  <label>From <input type="date" id="start"></label>
  <label>To <input type="date" id="end"></label>
  <button id="clear">All data</button>
  <a href="{{DOWNLOAD_PATH}}" download>Download CSV</a>
  <span id="badge" class="badge"></span>
</div>
<p id="message"></p>
<p id="summary"></p>
<canvas id="graph-vix"></canvas>
<canvas id="graph-variation"></canvas>
<hr>
<h2>Daily Report</h2>
<pre id="report"></pre>
<script>
const DATA_REFRESH_MS = {{DATA_REFRESH_MS}};
const REPORT_REFRESH_MS = {{REPORT_REFRESH_MS}};
let lineChart = null, barChart = null;

function query() {
  const start = document.getElementById("start").value;
  const end = document.getElementById("end").value;
  return start && end ? `?start=${start}&end=${end}` : "";
}

function draw(view) {
  document.getElementById("message").textContent = view.message || "";
  const badge = document.getElementById("badge");
  badge.textContent = view.alert ? `${view.alert.label} (${view.alert.value.toFixed(2)})` : "";
  badge.className = view.alert ? `badge ${view.alert.color}` : "badge";
  document.getElementById("summary").textContent = view.summary ? view.summary.text : "";

  const labels = view.chart.timestamps;
  if (lineChart) lineChart.destroy();
  if (barChart) barChart.destroy();
  lineChart = new Chart(document.getElementById("graph-vix"), {
    type: "line",
    data: { labels, datasets: [
      { label: "VIX", data: view.chart.values, borderColor: "red", borderWidth: 2 },
      { label: `SMA ${view.chart.short_window}`, data: view.chart.sma_short, borderColor: "blue", pointRadius: 0 },
      { label: `SMA ${view.chart.long_window}`, data: view.chart.sma_long, borderColor: "green", pointRadius: 0 },
    ] },
  });
  barChart = new Chart(document.getElementById("graph-variation"), {
    type: "bar",
    data: { labels: view.variation.timestamps, datasets: [
      { label: "Variation (%)", data: view.variation.pct_change,
        backgroundColor: view.variation.pct_change.map(v => v !== null && v < 0 ? "green" : "red") },
    ] },
  });
}

async function refreshData() {
  const response = await fetch("/api/dashboard" + query());
  if (!response.ok) {
    document.getElementById("message").textContent = await response.text();
    return;
  }
  draw(await response.json());
}

async function refreshReport() {
  const response = await fetch("/api/report");
  if (response.ok) {
    document.getElementById("report").textContent = (await response.json()).report;
  }
}

document.getElementById("start").addEventListener("change", refreshData);
document.getElementById("end").addEventListener("change", refreshData);
document.getElementById("clear").addEventListener("click", () => {
  document.getElementById("start").value = "";
  document.getElementById("end").value = "";
  refreshData();
});

refreshData();
refreshReport();
setInterval(refreshData, DATA_REFRESH_MS);
setInterval(refreshReport, REPORT_REFRESH_MS);
</script>
</body>
</html>
"##;

/// Render the page for the given settings
pub fn render(settings: &PageSettings) -> String {
    TEMPLATE
        .replace("{{TITLE}}", &escape_html(&settings.title))
        .replace("{{DOWNLOAD_PATH}}", &escape_html(&settings.download_path))
        .replace(
            "{{DATA_REFRESH_MS}}",
            &(settings.data_refresh_secs.saturating_mul(1000)).to_string(),
        )
        .replace(
            "{{REPORT_REFRESH_MS}}",
            &(settings.report_refresh_secs.saturating_mul(1000)).to_string(),
        )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
