//! 摘要服务接口 - 业务能力层
//!
//! 只描述外部摘要服务"能做什么"：上传文档、生成回复、删除已上传文档。
//! 流程层只依赖 `SummaryBackend`，不关心具体供应商。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型（兼容 OpenAI API 的服务）

use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartFile,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, FileObject,
    },
    types::files::{CreateFileRequestArgs, FilePurpose},
    Client,
};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;

/// 已上传到服务端的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub id: String,
    pub file_name: String,
}

/// 一次生成请求
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_message: String,
    pub user_message: String,
    /// 引用的已上传文档（可选）
    pub attachment: Option<UploadedDocument>,
    /// 回复长度上限
    pub max_tokens: u32,
}

/// 外部摘要服务
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// 服务名称（用于日志）
    fn name(&self) -> &str;

    /// 以原始二进制形式上传文档
    async fn upload_document(&self, path: &Path) -> Result<UploadedDocument>;

    /// 发送请求并返回文本回复
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// 删除已上传的文档
    async fn discard_document(&self, _document: &UploadedDocument) -> Result<()> {
        Ok(())
    }
}

/// OpenAI 兼容服务
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
}

impl OpenAiBackend {
    /// 创建服务；未配置 API Key 时返回 None
    pub fn new(config: &Config) -> Option<Self> {
        let api_key = config.llm_api_key.as_deref()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Some(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
        })
    }

    /// 构建聊天请求；有附件时用户消息为 文字 + 文件引用
    fn chat_request(&self, request: &CompletionRequest) -> Result<CreateChatCompletionRequest> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system_message.as_str())
            .build()?;

        let user_msg = match &request.attachment {
            Some(document) => {
                // FileObject 只能通过反序列化构造
                let file: FileObject = serde_json::from_value(json!({ "file_id": document.id }))?;
                let parts = vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: request.user_message.clone(),
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::File(
                        ChatCompletionRequestMessageContentPartFile { file },
                    ),
                ];
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()?
            }
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_message.as_str())
                .build()?,
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .max_tokens(request.max_tokens)
            .build()?;
        Ok(chat_request)
    }
}

#[async_trait]
impl SummaryBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn upload_document(&self, path: &Path) -> Result<UploadedDocument> {
        debug!("上传文档: {}", path.display());

        let request = CreateFileRequestArgs::default()
            .file(path)
            .purpose(FilePurpose::UserData)
            .build()?;

        let file = self
            .client
            .files()
            .create(request)
            .await
            .with_context(|| format!("上传文档失败: {}", path.display()))?;

        debug!("上传成功，文件 ID: {}", file.id);

        Ok(UploadedDocument {
            id: file.id,
            file_name: file.filename,
        })
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", request.user_message.len());

        let chat_request = self.chat_request(request)?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    async fn discard_document(&self, document: &UploadedDocument) -> Result<()> {
        self.client
            .files()
            .delete(&document.id)
            .await
            .with_context(|| format!("删除已上传文档失败: {}", document.id))?;
        Ok(())
    }
}
