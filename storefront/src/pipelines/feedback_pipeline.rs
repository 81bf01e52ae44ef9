use shopflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{error, info};

use crate::errors::AppError;
use crate::pipelines::contexts::FeedbackCtxData;
use crate::services::mailer::OutgoingMail;

pub fn register_feedback_pipeline(flows: &Registry<AppError>) {
  let mut p = Pipeline::<FeedbackCtxData, AppError>::new(&[
    ("validate_feedback", false, None),
    ("compose_feedback_mail", false, None),
    ("send_feedback_mail", false, None),
  ]);

  p.on_root("validate_feedback", |ctx_data: ContextData<FeedbackCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let missing = [&guard.email, &guard.subject, &guard.message]
        .iter()
        .any(|field| field.trim().is_empty());
      if missing {
        return Err(AppError::form("Please fill all required fields.", "/feedback"));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("compose_feedback_mail", |ctx_data: ContextData<FeedbackCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let config = guard.app_state.config.clone();
      let name = guard.name.trim().to_string();
      let email = guard.email.trim().to_string();
      let mail = OutgoingMail {
        from_name: Some(name.clone()).filter(|n| !n.is_empty()),
        from: config.mail_from.clone(),
        to: config.feedback_inbox.clone(),
        reply_to: Some(email.clone()),
        subject: format!("[Feedback] {}", guard.subject.trim()),
        body: format!("Name: {name}\nEmail: {email}\n\nMessage:\n{}", guard.message),
      };
      guard.mail = Some(mail);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("send_feedback_mail", |ctx_data: ContextData<FeedbackCtxData>| {
    Box::pin(async move {
      let (mail, mailer) = {
        let mut guard = ctx_data.write();
        let mail = guard
          .mail
          .take()
          .ok_or_else(|| AppError::Internal("feedback mail not composed".to_string()))?;
        (mail, guard.app_state.mailer.clone())
      };
      let subject = mail.subject.clone();
      if let Err(e) = mailer.send(mail).await {
        error!(error = %e, %subject, "Feedback mail failed.");
        return Err(e);
      }
      info!(%subject, "Feedback forwarded.");
      ctx_data.write().sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}
