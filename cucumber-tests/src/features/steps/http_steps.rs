use crate::features::world::LeadpoolWorld;
use cucumber::{given, then, when};
use serde_json::json;

#[given(expr = "a running leadpool server")]
async fn given_running_server(world: &mut LeadpoolWorld) {
    world.start_server().await.expect("server failed to start");
}

#[when(expr = "I POST a {string} lead named {string} as {string}")]
async fn when_post_lead(world: &mut LeadpoolWorld, lead_type: String, name: String, agent: String) {
    let body = json!({
        "name": name,
        "type": lead_type,
        "phoneNumber": "0161 496 0000",
        "streetAddress": "4 Canal Street",
        "city": "Manchester",
        "postcode": "M1 3HE",
        "emailAddress": "hello@example.com",
    });
    world
        .send("POST", "/api/leads", Some((agent.as_str(), "Lead Generation")), Some(body))
        .await
        .expect("request failed");
}

#[when(expr = "I GET {string}")]
async fn when_get(world: &mut LeadpoolWorld, path: String) {
    world.send("GET", &path, Some(("tm-1", "Telemarketer")), None).await.expect("request failed");
}

#[when(expr = "I GET {string} without identity")]
async fn when_get_anonymous(world: &mut LeadpoolWorld, path: String) {
    world.send("GET", &path, None, None).await.expect("request failed");
}

#[then(expr = "the response status is {int}")]
async fn then_status(world: &mut LeadpoolWorld, status: u16) {
    let (actual, body) = world.last_response.as_ref().expect("no response recorded");
    assert_eq!(*actual, status, "body: {}", body);
}

#[then(expr = "the response field {string} is {int}")]
async fn then_field_number(world: &mut LeadpoolWorld, field: String, value: u64) {
    let (_, body) = world.last_response.as_ref().expect("no response recorded");
    assert_eq!(body[&field].as_u64(), Some(value), "body: {}", body);
}

#[then(expr = "the response field {string} is {string}")]
async fn then_field_text(world: &mut LeadpoolWorld, field: String, value: String) {
    let (_, body) = world.last_response.as_ref().expect("no response recorded");
    assert_eq!(body[&field].as_str(), Some(value.as_str()), "body: {}", body);
}
