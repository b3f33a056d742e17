use serde::{Deserialize, Serialize};

use crate::models::{
    channel::{WhatsAppContent, WhatsAppMessage},
    message::MediaKind,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphMessageRequest {
    pub messaging_product: String,
    pub recipient_type: String,
    pub to: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<GraphText>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<GraphMedia>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<GraphMedia>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<GraphMedia>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<GraphMedia>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<GraphTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphText {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphMedia {
    pub link: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub caption: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphTemplate {
    pub name: String,
    pub language: GraphLanguage,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub components: Vec<GraphComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphLanguage {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Vec<GraphParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphParameter {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphMessageResponse {
    #[serde(default)]
    pub messages: Vec<GraphMessageId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphMessageId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorDetail {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: i64,
}

impl From<&WhatsAppMessage> for GraphMessageRequest {
    fn from(message: &WhatsAppMessage) -> Self {
        let mut request = Self {
            messaging_product: "whatsapp".to_string(),
            recipient_type: "individual".to_string(),
            to: message.to.clone(),
            kind: String::new(),
            text: None,
            image: None,
            document: None,
            audio: None,
            video: None,
            template: None,
        };

        match &message.content {
            WhatsAppContent::Text { body } => {
                request.kind = "text".to_string();
                request.text = Some(GraphText {
                    preview_url: true,
                    body: body.clone(),
                });
            }
            WhatsAppContent::Media {
                kind,
                link,
                caption,
                filename,
            } => {
                let media = GraphMedia {
                    link: link.clone(),
                    caption: caption.clone(),
                    filename: None,
                };

                match kind {
                    MediaKind::Document => {
                        request.kind = "document".to_string();
                        request.document = Some(GraphMedia {
                            filename: filename.clone(),
                            ..media
                        });
                    }
                    MediaKind::Audio => {
                        request.kind = "audio".to_string();
                        request.audio = Some(media);
                    }
                    MediaKind::Video => {
                        request.kind = "video".to_string();
                        request.video = Some(media);
                    }
                    MediaKind::Image | MediaKind::Unknown => {
                        request.kind = "image".to_string();
                        request.image = Some(media);
                    }
                }
            }
            WhatsAppContent::Template {
                name,
                language,
                parameters,
            } => {
                let components = if parameters.is_empty() {
                    Vec::new()
                } else {
                    vec![GraphComponent {
                        kind: "body".to_string(),
                        parameters: parameters
                            .iter()
                            .map(|text| GraphParameter {
                                kind: "text".to_string(),
                                text: text.clone(),
                            })
                            .collect(),
                    }]
                };

                request.kind = "template".to_string();
                request.template = Some(GraphTemplate {
                    name: name.clone(),
                    language: GraphLanguage {
                        code: language.clone(),
                    },
                    components,
                });
            }
        }

        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_message_enables_link_preview() {
        let message = WhatsAppMessage {
            to: "+15550001111".to_string(),
            content: WhatsAppContent::Text {
                body: "Hi".to_string(),
            },
        };

        let value = serde_json::to_value(GraphMessageRequest::from(&message)).unwrap();

        assert_eq!(value["messaging_product"], "whatsapp");
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"]["preview_url"], true);
        assert!(value.get("image").is_none());
    }

    #[test]
    fn unknown_media_is_sent_as_image() {
        let message = WhatsAppMessage {
            to: "+15550001111".to_string(),
            content: WhatsAppContent::Media {
                kind: MediaKind::Unknown,
                link: "https://cdn.example.com/x".to_string(),
                caption: String::new(),
                filename: Some("ignored.pdf".to_string()),
            },
        };

        let value = serde_json::to_value(GraphMessageRequest::from(&message)).unwrap();

        assert_eq!(value["type"], "image");
        assert_eq!(value["image"]["link"], "https://cdn.example.com/x");
        assert!(value["image"].get("caption").is_none());
        assert!(value["image"].get("filename").is_none());
    }

    #[test]
    fn template_without_parameters_has_no_components() {
        let message = WhatsAppMessage {
            to: "+15550001111".to_string(),
            content: WhatsAppContent::Template {
                name: "welcome".to_string(),
                language: "en".to_string(),
                parameters: Vec::new(),
            },
        };

        let value = serde_json::to_value(GraphMessageRequest::from(&message)).unwrap();

        assert_eq!(value["template"]["name"], "welcome");
        assert_eq!(value["template"]["language"]["code"], "en");
        assert!(value["template"].get("components").is_none());
    }
}
