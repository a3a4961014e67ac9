use chrono::Utc;

use crate::services::external::InvoiceParams;

/// Deterministic offline invoice template. Always available, no network, no
/// quota; the fallback whenever the AI generator is denied or fails.
pub fn render_local_template(params: &InvoiceParams) -> String {
    let amount = params.hours_worked * params.hourly_rate;
    let invoice_date = Utc::now().format("%Y-%m-%d").to_string();
    let due_date = params.due_date.as_deref().unwrap_or("On receipt");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>TaskBill Invoice</title>
  <style>
    body {{
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      background: #f3f4f6;
      margin: 0;
      padding: 20px;
    }}
    .invoice-box {{
      max-width: 800px;
      margin: auto;
      background: #ffffff;
      padding: 30px;
      border-radius: 8px;
      box-shadow: 0 4px 12px rgba(0,0,0,0.1);
      color: #333;
    }}
    h1, h2 {{ margin: 0; }}
    .header {{
      text-align: center;
      border-bottom: 2px solid #e5e7eb;
      padding-bottom: 10px;
      margin-bottom: 20px;
    }}
    .header p {{ color: #00bfa6; font-weight: 500; }}
    .section {{ margin-bottom: 20px; }}
    .section h2 {{ font-size: 18px; margin-bottom: 8px; color: #111827; }}
    .details p {{ margin: 4px 0; }}
    table {{ width: 100%; border-collapse: collapse; margin-top: 10px; }}
    table thead {{ background-color: #f9fafb; }}
    table th, table td {{
      padding: 12px;
      border: 1px solid #e5e7eb;
      text-align: right;
    }}
    table th:first-child, table td:first-child {{ text-align: left; }}
    .total-row td {{ font-weight: bold; background-color: #f3f4f6; }}
    .footer {{
      text-align: center;
      font-size: 13px;
      color: #6b7280;
      border-top: 1px solid #e5e7eb;
      padding-top: 10px;
      margin-top: 30px;
    }}
    .note {{ text-align: center; font-style: italic; color: #374151; }}
  </style>
</head>
<body>
  <div class="invoice-box">
    <div class="header">
      <h1>TaskBill Invoice</h1>
      <p>Time tracked. Billed. Done.</p>
    </div>

    <div class="section details">
      <p><strong>Invoice ID:</strong> {invoice_id}</p>
      <p><strong>Invoice Date:</strong> {invoice_date}</p>
      <p><strong>Due Date:</strong> {due_date}</p>
    </div>

    <div class="section">
      <div style="display: flex; justify-content: space-between;">
        <div>
          <h2>Billed To:</h2>
          <p><strong>Client Name:</strong> {client_name}</p>
          <p><strong>Client Email:</strong> {client_email}</p>
        </div>
        <div>
          <h2>From:</h2>
          <p><strong>TaskBill</strong></p>
          <p><strong>Email:</strong> {freelancer_email}</p>
        </div>
      </div>
    </div>

    <div class="section">
      <h2>Project Details:</h2>
      <p><strong>Project Name:</strong> {project_name}</p>
      <p><strong>Task Name:</strong> {task_name}</p>
      <p><strong>Description:</strong> {project_description}</p>
    </div>

    <div class="section">
      <h2>Billing Summary:</h2>
      <table>
        <thead>
          <tr>
            <th>Description</th>
            <th>Quantity</th>
            <th>Rate</th>
            <th>Amount</th>
          </tr>
        </thead>
        <tbody>
          <tr>
            <td>{task_name}</td>
            <td>{hours:.2} hours</td>
            <td>${rate:.2}</td>
            <td>${amount:.2}</td>
          </tr>
        </tbody>
        <tfoot>
          <tr class="total-row">
            <td colspan="3">Total</td>
            <td>${amount:.2}</td>
          </tr>
        </tfoot>
      </table>
    </div>

    <div class="section">
      <h2>Payment Instructions:</h2>
      <p>Please remit payment to <strong>{freelancer_email}</strong> via bank transfer or PayPal by the due date.</p>
    </div>

    <div class="note section">
      <p>Thank you for your business! We look forward to working with you again.</p>
    </div>

    <div class="footer">
      <p>Generated by TaskBill</p>
    </div>
  </div>
</body>
</html>
"#,
        invoice_id = escape_html(&params.invoice_id),
        invoice_date = invoice_date,
        due_date = escape_html(due_date),
        client_name = escape_html(&params.client_name),
        client_email = escape_html(&params.client_email),
        freelancer_email = escape_html(&params.freelancer_email),
        project_name = escape_html(&params.project_name),
        task_name = escape_html(&params.task_name),
        project_description = escape_html(&params.project_description),
        hours = params.hours_worked,
        rate = params.hourly_rate,
        amount = amount,
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> InvoiceParams {
        InvoiceParams {
            invoice_id: "inv_test".to_string(),
            project_name: "Website Redesign".to_string(),
            project_description: "Landing page refresh".to_string(),
            task_name: "Build hero section".to_string(),
            client_name: "Acme".to_string(),
            client_email: "billing@acme.example".to_string(),
            freelancer_email: "me@taskbill.example".to_string(),
            hourly_rate: 50.0,
            hours_worked: 2.0,
            due_date: Some("2026-09-15".to_string()),
        }
    }

    #[test]
    fn template_bills_hours_times_rate() {
        let html = render_local_template(&sample_params());
        // Two hours at $50/hr appears as both line amount and total.
        assert!(html.contains("2.00 hours"));
        assert!(html.contains("$50.00"));
        assert!(html.contains("$100.00"));
        assert!(html.contains("inv_test"));
        assert!(html.contains("2026-09-15"));
    }

    #[test]
    fn template_escapes_untrusted_fields() {
        let mut params = sample_params();
        params.client_name = "<script>alert('x')</script>".to_string();
        params.project_name = "Fish & Chips".to_string();
        let html = render_local_template(&params);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(html.contains("Fish &amp; Chips"));
    }

    #[test]
    fn missing_due_date_falls_back_to_on_receipt() {
        let mut params = sample_params();
        params.due_date = None;
        let html = render_local_template(&params);
        assert!(html.contains("On receipt"));
    }
}
