pub const IMAGE_BASE_URL: &str = "https://img.example.com";

pub const ALICE_EMAIL: &str = "a@x.com";
pub const ALICE_USERNAME: &str = "alice";
pub const ALICE_PASSWORD: &str = "pw1";

pub const BOB_EMAIL: &str = "b@x.com";
pub const BOB_USERNAME: &str = "bob";
pub const BOB_PASSWORD: &str = "hunter2";

pub const CATALOG_JSON: &str = r#"{
  "songs": [
    {"title": "Discovery", "artist": "Daft Punk", "year": "2001", "web_url": "https://example.com/discovery", "img_url": "https://old.example.com/dp.jpg"},
    {"title": "Homework", "artist": "Daft Punk", "year": "1997"},
    {"title": "Play", "artist": "Moby", "year": "1999"},
    {"title": "Californication", "artist": "Red Hot Chili Peppers", "year": 1999},
    {"title": "A_B", "artist": "C", "year": 2000},
    {"title": "A", "artist": "B_C", "year": 2000}
  ]
}"#;
