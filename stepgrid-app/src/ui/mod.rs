mod render_grid;
mod render_overlay;
