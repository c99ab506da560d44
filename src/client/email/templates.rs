use chrono::NaiveDateTime;

use super::Email;
use models::ParkingPass;

const DATE_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

fn format_time(time: NaiveDateTime) -> String {
    time.format(DATE_FORMAT).to_string()
}

/// Link to the pass page of a paid order
pub fn pass_link(pass_url: &str, pass: &ParkingPass) -> String {
    format!("{}?session_id={}", pass_url, pass.order.stripe_payment_intent_id)
}

/// Confirmation sent to the customer once the payment succeeded
pub fn parking_pass_email(pass: &ParkingPass, pass_url: &str) -> Email {
    let link = pass_link(pass_url, pass);
    let pass_id = pass.order.stripe_payment_intent_id.to_string();
    let enter_after = format_time(pass.enter_after());
    let exit_by = format_time(pass.exit_by());
    let total = pass.total().to_string();

    let text = format!(
        "RESERVATION DETAILS\n\n\
         PARKING PASS: {pass_id}\n\
         LOCATION: {lot} - {location}\n\
         ENTER AFTER: {enter_after}\n\
         EXIT BY: {exit_by}\n\
         LICENSE PLATE: {plate} ({state})\n\n\
         PARKING TOTAL: {total}\n\n\
         View your pass: {link}\n",
        pass_id = pass_id,
        lot = pass.lot_name,
        location = pass.lot_location,
        enter_after = enter_after,
        exit_by = exit_by,
        plate = pass.order.license_plate,
        state = pass.order.license_state,
        total = total,
        link = link,
    );

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 400px; margin: 0 auto; background: #fff; border-radius: 8px; border: 1px solid #eee; padding: 24px;">
  <h2 style="text-align: center; font-size: 20px; margin-bottom: 24px;">RESERVATION DETAILS</h2>
  <a href="{link}" style="background-color: #2196F3; color: white; padding: 10px 20px; border-radius: 5px; text-decoration: none; display: inline-block; margin-bottom: 24px;">View your pass</a>
  <table style="width: 100%; font-size: 15px; margin-bottom: 24px;">
    <tr><td style="font-weight: bold;">PARKING PASS:</td><td style="text-align: right;">{pass_id}</td></tr>
    <tr><td style="font-weight: bold;">LOCATION:</td><td style="text-align: right;">{lot}<br>{location}</td></tr>
    <tr><td style="font-weight: bold;">ENTER AFTER:</td><td style="text-align: right;">{enter_after}</td></tr>
    <tr><td style="font-weight: bold;">EXIT BY:</td><td style="text-align: right;">{exit_by}</td></tr>
    <tr><td style="font-weight: bold;">LICENSE PLATE:</td><td style="text-align: right;">{plate} ({state})</td></tr>
  </table>
  <h3 style="font-size: 16px; margin-bottom: 8px;">PARKING TOTAL</h3>
  <div style="font-size: 28px; font-weight: bold; text-align: center; margin-bottom: 16px;">{total}</div>
</div>"#,
        link = escape(&link),
        pass_id = escape(&pass_id),
        lot = escape(&pass.lot_name),
        location = escape(&pass.lot_location),
        enter_after = enter_after,
        exit_by = exit_by,
        plate = escape(&pass.order.license_plate),
        state = escape(&pass.order.license_state),
        total = total,
    );

    Email {
        to: pass.order.email.clone(),
        subject: format!("Your parking pass for {}", pass.lot_name),
        text,
        html,
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use models::*;

    fn pass() -> ParkingPass {
        let start = NaiveDate::from_ymd(2024, 7, 4).and_hms(9, 5, 0);
        let end = NaiveDate::from_ymd(2024, 7, 4).and_hms(13, 5, 0);
        ParkingPass {
            order: Order {
                order_id: OrderId::generate(),
                lot_id: LotId::generate(),
                schedule_id: ScheduleId::generate(),
                price_tier: None,
                email: "driver@example.com".to_string(),
                phone: "+15551234567".to_string(),
                license_plate: "ABC123".to_string(),
                license_state: "NY".to_string(),
                vehicle_type: VehicleType::Standard,
                start_time: start,
                end_time: end,
                total_amount: Amount::new(1250).unwrap(),
                payment_status: PaymentStatus::Paid,
                stripe_payment_intent_id: PaymentIntentId::new("pi_42".to_string()),
                created_at: start,
                updated_at: start,
            },
            lot_name: "Stadium <North>".to_string(),
            lot_location: "1 Arena Way".to_string(),
            price_tier: None,
        }
    }

    #[test]
    fn test_pass_email_fields() {
        let email = parking_pass_email(&pass(), "https://parking.test/checkout/success");
        assert_eq!(email.to, "driver@example.com");
        assert_eq!(email.subject, "Your parking pass for Stadium <North>");
        assert!(email.text.contains("PARKING PASS: pi_42"));
        assert!(email.text.contains("ENTER AFTER: Jul 4, 2024 9:05 AM"));
        assert!(email.text.contains("EXIT BY: Jul 4, 2024 1:05 PM"));
        assert!(email.text.contains("PARKING TOTAL: $12.50"));
        assert!(email.text.contains("https://parking.test/checkout/success?session_id=pi_42"));
    }

    #[test]
    fn test_html_is_escaped() {
        let email = parking_pass_email(&pass(), "https://parking.test/checkout/success");
        assert!(email.html.contains("Stadium &lt;North&gt;"));
        assert!(!email.html.contains("<North>"));
        assert!(email.html.contains(r#"href="https://parking.test/checkout/success?session_id=pi_42""#));
    }
}
