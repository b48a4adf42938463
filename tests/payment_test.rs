use fakebnb::model::CardDetails;
use fakebnb::payment::{FakePaymentGateway, PaymentError};

fn card(number: &str, expiry: &str, cvc: &str) -> CardDetails {
    CardDetails {
        holder: "Ana Gomez".to_string(),
        number: number.to_string(),
        expiry: expiry.to_string(),
        cvc: cvc.to_string(),
    }
}

#[test]
fn test_fake_payment_approves_plausible_card() {
    let receipt = FakePaymentGateway
        .charge(&card("4242 4242 4242 4242", "12/30", "123"), 450)
        .unwrap();
    assert_eq!(receipt.amount, 450);
    assert_eq!(receipt.card_last4, "4242");
    assert!(receipt.reference.starts_with("PAY-"));
}

#[test]
fn test_fake_payment_rejects_bad_forms() {
    let gateway = FakePaymentGateway;

    let mut blank = card("4242424242424242", "12/30", "123");
    blank.holder = "  ".to_string();
    assert_eq!(gateway.charge(&blank, 1), Err(PaymentError::MissingField("card holder")));

    assert_eq!(gateway.charge(&card("", "12/30", "123"), 1), Err(PaymentError::MissingField("card number")));
    assert_eq!(gateway.charge(&card("4242", "12/30", "123"), 1), Err(PaymentError::InvalidCardNumber));
    assert_eq!(gateway.charge(&card("4242abcd42424242", "12/30", "123"), 1), Err(PaymentError::InvalidCardNumber));
    assert_eq!(gateway.charge(&card("4242424242424242", "13/30", "123"), 1), Err(PaymentError::InvalidExpiry));
    assert_eq!(gateway.charge(&card("4242424242424242", "1230", "123"), 1), Err(PaymentError::InvalidExpiry));
    assert_eq!(gateway.charge(&card("4242424242424242", "+1/30", "123"), 1), Err(PaymentError::InvalidExpiry));
    assert_eq!(gateway.charge(&card("4242424242424242", "12/30", "12"), 1), Err(PaymentError::InvalidCvc));
}
