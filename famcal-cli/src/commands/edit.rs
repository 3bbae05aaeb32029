use anyhow::Result;

use crate::commands::add::{self, Fields};
use crate::context;

pub async fn run(id: &str, fields: Fields) -> Result<()> {
    let interactive = fields.title.is_none()
        && fields.date.is_none()
        && fields.time.is_none()
        && !fields.all_day
        && fields.notes.is_none()
        && fields.color.is_none();

    let mut ctx = context::open().await?;

    let draft = ctx.service.open_edit(id)?;
    fields.apply(draft)?;

    if interactive {
        add::prompt_form(draft)?;
    }

    add::save(&mut ctx.service).await
}
